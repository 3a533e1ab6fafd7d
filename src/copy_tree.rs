use std::fs;
use std::path::Path;

use crate::runner::BuildTree;

const SKIP_NAMES: &[&str] = &[".git", ".hg", ".svn"];

const SKIP_SUFFIXES: &[&str] = &[".patmut.bak"];

/// A private copy of a build tree. The copy is deleted when this is dropped.
pub struct IsolatedTree {
    pub tree: BuildTree,
    _temp_dir: tempfile::TempDir,
}

fn should_skip(name: &str) -> bool {
    SKIP_NAMES.iter().any(|s| *s == name) || SKIP_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Recursively copy `src` into `dst`, skipping VCS metadata and backups.
/// Symlinks are recreated as links on unix and skipped elsewhere.
pub fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if should_skip(&name.to_string_lossy()) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let ft = entry.file_type()?;
        if ft.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else if ft.is_file() {
            fs::copy(&src_path, &dst_path)?;
        } else if ft.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(_src: &Path, _dst: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Make `count` independent copies of `tree`, one per worker.
pub fn isolate(tree: &BuildTree, count: usize, session_id: &str) -> std::io::Result<Vec<IsolatedTree>> {
    (0..count)
        .map(|worker| -> std::io::Result<IsolatedTree> {
            let temp_dir = tempfile::Builder::new()
                .prefix(&format!("patmut-{session_id}-w{worker}-"))
                .tempdir()?;
            copy_tree(tree.root(), temp_dir.path())?;
            log::debug!(
                "worker {} tree copied to {}",
                worker,
                temp_dir.path().display()
            );
            Ok(IsolatedTree {
                tree: tree.relocate(temp_dir.path()),
                _temp_dir: temp_dir,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_tree_copies_files_and_skips_vcs() {
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path();
        fs::write(src.join("counter.adb"), "X := 1;").unwrap();
        fs::create_dir(src.join(".git")).unwrap();
        fs::write(src.join(".git").join("HEAD"), "ref").unwrap();
        fs::write(src.join(".counter.adb.patmut.bak"), "stale").unwrap();

        let dst_dir = TempDir::new().unwrap();
        copy_tree(src, dst_dir.path()).unwrap();

        assert!(dst_dir.path().join("counter.adb").exists());
        assert!(!dst_dir.path().join(".git").exists());
        assert!(!dst_dir.path().join(".counter.adb.patmut.bak").exists());
    }

    #[test]
    fn copy_tree_preserves_nested_structure() {
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path();
        fs::create_dir_all(src.join("src").join("any")).unwrap();
        fs::write(src.join("src").join("any").join("pkg.adb"), "null;").unwrap();

        let dst_dir = TempDir::new().unwrap();
        copy_tree(src, dst_dir.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dst_dir.path().join("src").join("any").join("pkg.adb")).unwrap(),
            "null;"
        );
    }

    #[test]
    fn isolate_gives_each_worker_its_own_copy() {
        let src_dir = TempDir::new().unwrap();
        fs::write(src_dir.path().join("pkg.adb"), "original").unwrap();
        let tree = BuildTree::new(src_dir.path(), "pkg.adb").unwrap();

        let copies = isolate(&tree, 2, "test").unwrap();
        assert_eq!(copies.len(), 2);
        assert_ne!(copies[0].tree.root(), copies[1].tree.root());

        fs::write(copies[0].tree.tracked(), "mutated").unwrap();
        assert_eq!(fs::read_to_string(copies[1].tree.tracked()).unwrap(), "original");
        assert_eq!(fs::read_to_string(tree.tracked()).unwrap(), "original");
    }

    #[test]
    fn should_skip_filters_correctly() {
        assert!(should_skip(".git"));
        assert!(should_skip(".svn"));
        assert!(should_skip(".pkg.adb.patmut.bak"));
        assert!(!should_skip("pkg.adb"));
        assert!(!should_skip("obj"));
    }
}
