//! In-memory [`FileSystem`] for exercising the orchestrators without touching disk.
//!
//! Nodes are keyed by absolute path. Failures can be scripted per operation and
//! path, volumes assigned per subtree, and directories flagged as mount points.
//! Every call is recorded so tests can assert on exact attempt counts.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::native::{CopyFileFlags, FileSystem, NativeCode, NativeEntry, NativeError, NativeResult};
use crate::types::{DirectoryEntryInfo, FileAttributes, TransactionContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    List,
    Query,
    CreateDir,
    RemoveDir,
    DeleteFile,
    Move,
    Copy,
    SetAttributes,
    Unmount,
    SameVolume,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Kind {
    Dir,
    File,
    Link { to_dir: bool },
}

#[derive(Clone, Debug)]
struct Node {
    kind: Kind,
    attributes: FileAttributes,
    size: u64,
    volume: u32,
    mounted: bool,
}

#[derive(Clone, Debug)]
struct Failure {
    op: Op,
    path: PathBuf,
    code: NativeCode,
    /// `None` fails forever.
    remaining: Option<u32>,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    failures: Vec<Failure>,
    calls: Vec<(Op, PathBuf)>,
}

pub struct MemFileSystem {
    state: RefCell<State>,
}

impl Default for MemFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFileSystem {
    /// A file system holding only the root directory `/` on volume 0.
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert(
            PathBuf::from("/"),
            Node {
                kind: Kind::Dir,
                attributes: FileAttributes::empty(),
                size: 0,
                volume: 0,
                mounted: false,
            },
        );
        Self {
            state: RefCell::new(state),
        }
    }

    fn insert(&self, path: &Path, kind: Kind, size: u64) {
        let mut st = self.state.borrow_mut();
        let volume = path
            .parent()
            .and_then(|p| st.nodes.get(p))
            .map(|n| n.volume)
            .unwrap_or(0);
        st.nodes.insert(
            path.to_path_buf(),
            Node {
                kind,
                attributes: FileAttributes::empty(),
                size,
                volume,
                mounted: false,
            },
        );
    }

    /// Add a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|p| !self.exists(p))
            .map(Path::to_path_buf)
            .collect();
        for p in missing.iter().rev() {
            self.insert(p, Kind::Dir, 0);
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, size: u64) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.insert(path, Kind::File, size);
    }

    pub fn add_link(&self, path: impl AsRef<Path>, to_dir: bool) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.insert(path, Kind::Link { to_dir }, 0);
    }

    pub fn set_read_only(&self, path: impl AsRef<Path>) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(path.as_ref()) {
            n.attributes.insert(FileAttributes::READ_ONLY);
        }
    }

    /// Put `path` and everything below it on `volume`.
    pub fn set_volume(&self, path: impl AsRef<Path>, volume: u32) {
        let path = path.as_ref();
        for (p, n) in self.state.borrow_mut().nodes.iter_mut() {
            if p.starts_with(path) {
                n.volume = volume;
            }
        }
    }

    pub fn mount(&self, path: impl AsRef<Path>) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(path.as_ref()) {
            n.mounted = true;
        }
    }

    /// Make `op` on `path` fail with `code`, `times` times or forever when `None`.
    pub fn fail(&self, op: Op, path: impl AsRef<Path>, code: NativeCode, times: Option<u32>) {
        self.state.borrow_mut().failures.push(Failure {
            op,
            path: path.as_ref().to_path_buf(),
            code,
            remaining: times,
        });
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.borrow().nodes.contains_key(path.as_ref())
    }

    pub fn is_mounted(&self, path: impl AsRef<Path>) -> bool {
        self.state
            .borrow()
            .nodes
            .get(path.as_ref())
            .is_some_and(|n| n.mounted)
    }

    pub fn size_of(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.state.borrow().nodes.get(path.as_ref()).map(|n| n.size)
    }

    /// Every path currently present, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.borrow().nodes.keys().cloned().collect()
    }

    /// Number of recorded calls of `op` on `path`.
    pub fn calls(&self, op: Op, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|(o, p)| *o == op && p == path)
            .count()
    }

    /// Number of recorded calls of `op` on any path.
    pub fn total_calls(&self, op: Op) -> usize {
        self.state.borrow().calls.iter().filter(|(o, _)| *o == op).count()
    }

    fn enter(&self, op: Op, path: &Path) -> NativeResult<()> {
        let mut st = self.state.borrow_mut();
        st.calls.push((op, path.to_path_buf()));
        for f in st.failures.iter_mut() {
            if f.op != op || f.path != path {
                continue;
            }
            match f.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Err(NativeError::new(f.code));
        }
        Ok(())
    }

    fn node(&self, path: &Path) -> NativeResult<Node> {
        self.state
            .borrow()
            .nodes
            .get(path)
            .cloned()
            .ok_or(NativeError::new(NativeCode::PathNotFound))
    }

    fn has_children(&self, path: &Path) -> bool {
        self.state
            .borrow()
            .nodes
            .keys()
            .any(|p| p.parent() == Some(path))
    }

    fn parent_dir(&self, path: &Path) -> NativeResult<Node> {
        let parent = path.parent().ok_or(NativeError::new(NativeCode::PathNotFound))?;
        let node = self.node(parent)?;
        if node.kind != Kind::Dir {
            return Err(NativeError::new(NativeCode::PathNotFound));
        }
        Ok(node)
    }

    fn to_entry(path: &Path, node: &Node) -> NativeEntry {
        let mut attributes = node.attributes;
        match node.kind {
            Kind::Dir | Kind::Link { to_dir: true } => attributes.insert(FileAttributes::DIRECTORY),
            _ => {}
        }
        if matches!(node.kind, Kind::Link { .. }) {
            attributes.insert(FileAttributes::REPARSE_POINT);
        }
        NativeEntry {
            name: path.file_name().unwrap_or(path.as_os_str()).to_os_string(),
            attributes,
            size: node.size,
            is_reparse_point: matches!(node.kind, Kind::Link { .. }),
            is_mount_point: node.mounted,
        }
    }
}

impl FileSystem for MemFileSystem {
    fn list_children(
        &self,
        dir: &Path,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<Vec<NativeEntry>> {
        self.enter(Op::List, dir)?;
        let node = self.node(dir)?;
        if node.kind == Kind::File {
            return Err(NativeError::new(NativeCode::NotADirectory));
        }
        let st = self.state.borrow();
        Ok(st
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir))
            .map(|(p, n)| Self::to_entry(p, n))
            .collect())
    }

    fn query_metadata(
        &self,
        path: &Path,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<DirectoryEntryInfo> {
        self.enter(Op::Query, path)?;
        let node = self.node(path)?;
        let parent = path.parent().unwrap_or(path);
        let mut info = Self::to_entry(path, &node).into_entry_info(parent);
        info.full_path = path.to_path_buf();
        Ok(info)
    }

    fn create_directory(&self, path: &Path, _tx: Option<&TransactionContext>) -> NativeResult<()> {
        self.enter(Op::CreateDir, path)?;
        if self.exists(path) {
            return Err(NativeError::new(NativeCode::AlreadyExists));
        }
        self.parent_dir(path)?;
        self.insert(path, Kind::Dir, 0);
        Ok(())
    }

    fn remove_directory(&self, path: &Path, _tx: Option<&TransactionContext>) -> NativeResult<()> {
        self.enter(Op::RemoveDir, path)?;
        let node = self.node(path)?;
        match node.kind {
            Kind::File | Kind::Link { to_dir: false } => {
                return Err(NativeError::new(NativeCode::NotADirectory));
            }
            Kind::Dir if self.has_children(path) => {
                return Err(NativeError::new(NativeCode::DirNotEmpty));
            }
            Kind::Dir if node.mounted => {
                return Err(NativeError::new(NativeCode::SharingViolation));
            }
            _ => {}
        }
        self.state.borrow_mut().nodes.remove(path);
        Ok(())
    }

    fn delete_file(&self, path: &Path, _tx: Option<&TransactionContext>) -> NativeResult<()> {
        self.enter(Op::DeleteFile, path)?;
        let node = self
            .node(path)
            .map_err(|_| NativeError::new(NativeCode::FileNotFound))?;
        if node.kind == Kind::Dir || node.attributes.is_read_only() {
            return Err(NativeError::new(NativeCode::AccessDenied));
        }
        self.state.borrow_mut().nodes.remove(path);
        Ok(())
    }

    fn move_entry(
        &self,
        src: &Path,
        dst: &Path,
        replace_existing: bool,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        self.enter(Op::Move, src)?;
        let node = self
            .node(src)
            .map_err(|_| NativeError::new(NativeCode::FileNotFound))?;
        let parent = self.parent_dir(dst)?;
        if parent.volume != node.volume {
            return Err(NativeError::new(NativeCode::NotSameDevice));
        }
        if self.exists(dst) {
            if !replace_existing {
                return Err(NativeError::new(NativeCode::AlreadyExists));
            }
            // Like rename(2): a file replaces a file, a directory only an empty directory.
            let target = self.node(dst)?;
            match (node.kind == Kind::Dir, target.kind == Kind::Dir) {
                (true, false) => return Err(NativeError::new(NativeCode::NotADirectory)),
                (false, true) => return Err(NativeError::new(NativeCode::AccessDenied)),
                (true, true) if self.has_children(dst) => {
                    return Err(NativeError::new(NativeCode::DirNotEmpty));
                }
                _ => {}
            }
            self.state.borrow_mut().nodes.remove(dst);
        }
        let mut st = self.state.borrow_mut();
        let moved: Vec<(PathBuf, Node)> = st
            .nodes
            .iter()
            .filter(|(p, _)| p.starts_with(src))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        for (p, _) in &moved {
            st.nodes.remove(p);
        }
        for (p, n) in moved {
            let rel = p.strip_prefix(src).unwrap_or(Path::new(""));
            let target = if rel.as_os_str().is_empty() {
                dst.to_path_buf()
            } else {
                dst.join(rel)
            };
            st.nodes.insert(target, n);
        }
        Ok(())
    }

    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        flags: &CopyFileFlags,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<u64> {
        self.enter(Op::Copy, src)?;
        let node = self
            .node(src)
            .map_err(|_| NativeError::new(NativeCode::FileNotFound))?;
        if node.kind == Kind::Dir {
            return Err(NativeError::new(NativeCode::AccessDenied));
        }
        if self.exists(dst) && !flags.overwrite {
            return Err(NativeError::new(NativeCode::FileExists));
        }
        let parent = self.parent_dir(dst)?;
        let copied = Node {
            volume: parent.volume,
            mounted: false,
            ..node
        };
        let size = copied.size;
        self.state.borrow_mut().nodes.insert(dst.to_path_buf(), copied);
        Ok(size)
    }

    fn set_attributes(
        &self,
        path: &Path,
        attributes: FileAttributes,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        self.enter(Op::SetAttributes, path)?;
        let mut st = self.state.borrow_mut();
        let node = st
            .nodes
            .get_mut(path)
            .ok_or(NativeError::new(NativeCode::PathNotFound))?;
        node.attributes = attributes
            .without(FileAttributes::DIRECTORY)
            .without(FileAttributes::REPARSE_POINT);
        Ok(())
    }

    fn unmount_mount_point(
        &self,
        path: &Path,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        self.enter(Op::Unmount, path)?;
        let mut st = self.state.borrow_mut();
        match st.nodes.get_mut(path) {
            Some(n) if n.mounted => {
                n.mounted = false;
                Ok(())
            }
            _ => Err(NativeError::new(NativeCode::MountPointNotFound)),
        }
    }

    fn same_volume(
        &self,
        a: &Path,
        b: &Path,
        _tx: Option<&TransactionContext>,
    ) -> NativeResult<bool> {
        self.enter(Op::SameVolume, a)?;
        Ok(self.node(a)?.volume == self.node(b)?.volume)
    }
}
