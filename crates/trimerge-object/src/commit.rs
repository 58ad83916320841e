use bstr::BString;
use trimerge_hash::ContentId;

/// A commit: a tree snapshot plus its place in the history graph.
///
/// Only the fields the merge core consumes are modeled: the tree, the
/// ordered parent list, the commit timestamp, and enough identity metadata
/// (author, message) to tag synthesized merge-base commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Identifier of the root tree.
    pub tree: ContentId,
    /// Parent commit identifiers (empty for a root commit).
    pub parents: Vec<ContentId>,
    /// Commit timestamp, seconds since the epoch.
    pub commit_time: i64,
    /// Author identity line.
    pub author: BString,
    /// Commit message.
    pub message: BString,
}

impl Commit {
    /// Canonical serialization, hashed to form the commit's identifier:
    /// tree and parent headers, author with timestamp, blank line, message.
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author);
        out.extend_from_slice(format!(" {} +0000\n", self.commit_time).as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }
}
