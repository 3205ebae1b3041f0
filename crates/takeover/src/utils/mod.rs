pub mod log;

use crate::Result;
use std::{fs, path::Path};

pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        Ok(false)
    } else {
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::ensure_dir;

    #[test]
    fn creates_missing_dir_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs").join("nested");

        assert_eq!(true, ensure_dir(&dir).unwrap());
        assert_eq!(false, ensure_dir(&dir).unwrap());
        assert!(dir.is_dir());
    }
}
