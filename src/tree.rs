// Browsing the filesystem at the tree level.

use std::collections::HashMap;

use log::debug;

use crate::cluster::Walk;
use crate::disk::ReadSeek;
use crate::entry::{FileEntry, StreamExtensionEntry};
use crate::error::ExfatError;
use crate::navigator::{EntrySet, Navigator};
use crate::volume::VolumeReader;

/// Paths handed to consumers join their components with a backslash.
pub const PATH_SEPARATOR: &str = "\\";

/// One file or directory in the lazily-populated tree.
///
/// Children are owned by their parent; the two name lists are kept in
/// ascending case-sensitive lexicographic order so enumeration is
/// deterministic irrespective of map iteration order.
#[derive(Clone, Debug)]
pub struct TreeNode {
    name: String,
    is_directory: bool,
    file: Option<FileEntry>,
    stream: Option<StreamExtensionEntry>,
    entry_set: Option<EntrySet>,
    loaded: bool,
    child_folders: Vec<String>,
    child_files: Vec<String>,
    children: HashMap<String, TreeNode>,
}

impl TreeNode {
    fn new(
        name: String,
        is_directory: bool,
        file: Option<FileEntry>,
        stream: Option<StreamExtensionEntry>,
        entry_set: Option<EntrySet>,
    ) -> TreeNode {
        TreeNode {
            name,
            is_directory,
            file,
            stream,
            entry_set,
            loaded: false,
            child_folders: Vec::new(),
            child_files: Vec::new(),
            children: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The File entry this node was created from. `None` only for the root.
    pub fn file_directory_entry(&self) -> Option<&FileEntry> {
        self.file.as_ref()
    }

    /// The Stream Extension entry this node was created from. `None` only
    /// for the root.
    pub fn stream_directory_entry(&self) -> Option<&StreamExtensionEntry> {
        self.stream.as_ref()
    }

    /// The complete index row this node was created from.
    pub fn indexed_entry_set(&self) -> Option<&EntrySet> {
        self.entry_set.as_ref()
    }

    /// Whether this node's children have been populated yet.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Child folder names, sorted.
    pub fn child_folders(&self) -> &[String] {
        &self.child_folders
    }

    /// Child file names, sorted.
    pub fn child_files(&self) -> &[String] {
        &self.child_files
    }

    pub fn get_child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    fn add_child(
        &mut self,
        name: String,
        is_directory: bool,
        file: Option<FileEntry>,
        stream: Option<StreamExtensionEntry>,
        entry_set: Option<EntrySet>,
    ) {
        let list = if is_directory {
            &mut self.child_folders
        } else {
            &mut self.child_files
        };

        if let Err(position) = list.binary_search(&name) {
            list.insert(position, name.clone());
        }

        let child = TreeNode::new(name.clone(), is_directory, file, stream, entry_set);
        self.children.insert(name, child);
    }
}

/// The lazy directory tree rooted at the volume's root directory.
///
/// Holds a non-owning back-reference to the volume reader; directories are
/// only read when a traversal first reaches them.
pub struct Tree<'a, R> {
    er: &'a mut VolumeReader<R>,
    root: TreeNode,
}

impl<'a, R: ReadSeek> Tree<'a, R> {
    pub fn new(er: &'a mut VolumeReader<R>) -> Tree<'a, R> {
        Tree {
            er,
            root: TreeNode::new(String::new(), true, None, None, None),
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Materializes the root directory. Subdirectories are not descended
    /// into; they load when first traversed.
    pub fn load(&mut self) -> Result<(), ExfatError> {
        let cluster_number = self.er.first_cluster_of_root_directory()?;
        load_directory(self.er, cluster_number, &mut self.root)
    }

    /// Resolves `path_parts` to a node, expanding unloaded directories on
    /// the way. An empty list resolves to the root.
    ///
    /// A missing child under a fully-loaded node is not an error; it
    /// resolves to `None`.
    pub fn lookup(&mut self, path_parts: &[&str]) -> Result<Option<&TreeNode>, ExfatError> {
        loop {
            let (consumed, loaded) = {
                let mut node = &self.root;
                let mut consumed = 0;
                for part in path_parts {
                    match node.children.get(*part) {
                        Some(child) => {
                            node = child;
                            consumed += 1;
                        }
                        None => break,
                    }
                }
                (consumed, node.loaded)
            };

            if consumed == path_parts.len() {
                let mut node = &self.root;
                for part in path_parts {
                    node = node
                        .children
                        .get(*part)
                        .ok_or(ExfatError::DanglingPathParts)?;
                }
                return Ok(Some(node));
            }

            // The find is unsuccessful once the node at the deepest reached
            // prefix has all of its children.
            if loaded {
                return Ok(None);
            }

            let root_cluster = self.er.first_cluster_of_root_directory()?;
            let mut node = &mut self.root;
            for part in &path_parts[..consumed] {
                node = node
                    .children
                    .get_mut(*part)
                    .ok_or(ExfatError::DanglingPathParts)?;
            }

            // Only directories expand; descending through a file resolves to
            // "not found", not an error.
            if !node.is_directory {
                return Ok(None);
            }

            let cluster_number = node
                .stream
                .as_ref()
                .map(StreamExtensionEntry::first_cluster)
                .unwrap_or(root_cluster);

            load_directory(self.er, cluster_number, node)?;
        }
    }

    /// Depth-first traversal: the parent (including the root, with an empty
    /// path), then each child folder's subtree, then the child files.
    /// Unloaded directories are expanded as they are reached.
    pub fn visit<F>(&mut self, mut cb: F) -> Result<(), ExfatError>
    where
        F: FnMut(&[String], &TreeNode) -> Result<Walk, ExfatError>,
    {
        let mut path_parts: Vec<String> = Vec::new();
        visit_node(self.er, &mut self.root, &mut path_parts, &mut cb)?;
        Ok(())
    }

    /// The flat list of backslash-joined paths (excluding the root) plus a
    /// path-to-node map, in traversal order.
    pub fn list(&mut self) -> Result<(Vec<String>, HashMap<String, &TreeNode>), ExfatError> {
        // Force every directory to load.
        self.visit(|_, _| Ok(Walk::Continue))?;

        let mut files = Vec::new();
        let mut nodes = HashMap::new();
        let mut path_parts: Vec<String> = Vec::new();
        collect(&self.root, &mut path_parts, &mut files, &mut nodes);

        debug!("tree listed: ({}) paths", files.len());
        Ok((files, nodes))
    }
}

fn load_directory<R: ReadSeek>(
    er: &mut VolumeReader<R>,
    cluster_number: u32,
    node: &mut TreeNode,
) -> Result<(), ExfatError> {
    let mut navigator = Navigator::new(er, cluster_number);
    let index = navigator.index()?;

    for (filename, is_directory) in index.filenames() {
        let entry_set = index.find_file(&filename).cloned();
        let file = entry_set
            .as_ref()
            .and_then(|set| set.primary.as_file().copied());
        let stream = entry_set
            .as_ref()
            .and_then(|set| set.stream_extension().copied());

        // Children load lazily; only register them here.
        node.add_child(filename, is_directory, file, stream, entry_set);
    }

    node.loaded = true;
    Ok(())
}

fn visit_node<R, F>(
    er: &mut VolumeReader<R>,
    node: &mut TreeNode,
    path_parts: &mut Vec<String>,
    cb: &mut F,
) -> Result<Walk, ExfatError>
where
    R: ReadSeek,
    F: FnMut(&[String], &TreeNode) -> Result<Walk, ExfatError>,
{
    if cb(path_parts, node)? == Walk::Stop {
        return Ok(Walk::Stop);
    }

    let folder_names = node.child_folders.clone();
    for name in folder_names {
        let child = node
            .children
            .get_mut(&name)
            .ok_or(ExfatError::DanglingPathParts)?;

        if !child.loaded {
            let cluster_number = child
                .stream
                .as_ref()
                .map(StreamExtensionEntry::first_cluster)
                .ok_or(ExfatError::DanglingPathParts)?;
            load_directory(er, cluster_number, child)?;
        }

        path_parts.push(name);
        let walk = visit_node(er, child, path_parts, cb)?;
        path_parts.pop();

        if walk == Walk::Stop {
            return Ok(Walk::Stop);
        }
    }

    // All of the files, at the bottom.
    let file_names = node.child_files.clone();
    for name in file_names {
        let child = node
            .children
            .get(&name)
            .ok_or(ExfatError::DanglingPathParts)?;

        path_parts.push(name);
        let walk = cb(path_parts, child)?;
        path_parts.pop();

        if walk == Walk::Stop {
            return Ok(Walk::Stop);
        }
    }

    Ok(Walk::Continue)
}

fn collect<'t>(
    node: &'t TreeNode,
    path_parts: &mut Vec<String>,
    files: &mut Vec<String>,
    nodes: &mut HashMap<String, &'t TreeNode>,
) {
    if !path_parts.is_empty() {
        let node_path = path_parts.join(PATH_SEPARATOR);
        files.push(node_path.clone());
        nodes.insert(node_path, node);
    }

    for name in &node.child_folders {
        if let Some(child) = node.children.get(name) {
            path_parts.push(name.clone());
            collect(child, path_parts, files, nodes);
            path_parts.pop();
        }
    }

    for name in &node.child_files {
        if let Some(child) = node.children.get(name) {
            path_parts.push(name.clone());
            collect(child, path_parts, files, nodes);
            path_parts.pop();
        }
    }
}
