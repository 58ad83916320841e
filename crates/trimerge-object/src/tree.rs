use std::cmp::Ordering;

use bstr::BString;
use trimerge_hash::ContentId;

use crate::ObjectError;

/// File mode for tree entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Submodule link (160000)
    Gitlink,
    /// Subdirectory (040000)
    Tree,
    /// Unknown mode (preserved for round-trip)
    Unknown(u32),
}

impl FileMode {
    /// Create from the raw numeric value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0o100644 => Self::Regular,
            0o100755 => Self::Executable,
            0o120000 => Self::Symlink,
            0o160000 => Self::Gitlink,
            0o040000 => Self::Tree,
            other => Self::Unknown(other),
        }
    }

    /// Parse from octal ASCII bytes (e.g., `b"100644"`).
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        let raw = parse_octal(s)
            .ok_or_else(|| ObjectError::InvalidFileMode(String::from_utf8_lossy(s).into()))?;
        Ok(Self::from_raw(raw))
    }

    /// The raw numeric value.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
            Self::Tree => 0o40000,
            Self::Unknown(v) => *v,
        }
    }

    /// Serialize to octal ASCII bytes (no leading zero for trees).
    pub fn as_bytes(&self) -> BString {
        BString::from(format!("{:o}", self.raw()))
    }

    /// Is this a tree (directory) entry?
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    /// Is this a blob (file) entry?
    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }

    /// Is this a symlink?
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// Parse an octal ASCII string to u32.
fn parse_octal(s: &[u8]) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut val: u32 = 0;
    for &b in s {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        val = val.checked_mul(8)?.checked_add(u32::from(b - b'0'))?;
    }
    Some(val)
}

/// A single tree entry: name, mode, and the content identifier.
///
/// Inside a stored [`Tree`] the name is a single path component. The tree
/// merge also uses this type for flattened entries, where the name carries
/// the full repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    pub name: BString,
    pub mode: FileMode,
    pub cid: ContentId,
}

impl TreeEntry {
    pub fn new(name: impl Into<BString>, mode: FileMode, cid: ContentId) -> Self {
        Self {
            name: name.into(),
            mode,
            cid,
        }
    }

    /// Compare entries using git's tree sorting rules.
    ///
    /// Directories sort as if they had a trailing '/': "foo" (dir) sorts
    /// after "foo-bar" but before "foo0".
    pub fn cmp_entries(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        base_name_compare(&a.name, a.mode.is_tree(), &b.name, b.mode.is_tree())
    }
}

/// Tree entry name comparison with the implicit trailing '/' on directories.
fn base_name_compare(name1: &[u8], is_dir1: bool, name2: &[u8], is_dir2: bool) -> Ordering {
    let min_len = name1.len().min(name2.len());
    let cmp = name1[..min_len].cmp(&name2[..min_len]);
    if cmp != Ordering::Equal {
        return cmp;
    }
    let c1 = if name1.len() > min_len {
        name1[min_len]
    } else if is_dir1 {
        b'/'
    } else {
        0
    };
    let c2 = if name2.len() > min_len {
        name2[min_len]
    } else if is_dir2 {
        b'/'
    } else {
        0
    };
    c1.cmp(&c2)
}

/// A tree object: entries keyed by name, unique within the tree, held in
/// canonical sort order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from entries, sorting them canonically.
    ///
    /// Fails if two entries share a name.
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Result<Self, ObjectError> {
        entries.sort_by(TreeEntry::cmp_entries);
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(ObjectError::DuplicateTreeEntry(pair[0].name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Insert an entry, replacing any existing entry with the same name.
    pub fn add(&mut self, entry: TreeEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == entry.name) {
            *existing = entry;
            self.entries.sort_by(TreeEntry::cmp_entries);
            return;
        }
        let pos = self
            .entries
            .partition_point(|e| TreeEntry::cmp_entries(e, &entry) == Ordering::Less);
        self.entries.insert(pos, entry);
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &[u8]) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_slice() == name)
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical serialization: `"{mode} {name}\0{digest}"` per entry, in
    /// entry order. This is the byte sequence the tree's identifier hashes.
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.cid.as_bytes());
        }
        out
    }
}
