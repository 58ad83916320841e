/// A blob: raw file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Serialize: blob content is just the raw data.
    pub fn serialize_content(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob() {
        assert!(Blob::new(Vec::new()).data.is_empty());
    }

    #[test]
    fn blob_with_null_bytes() {
        let data = b"hello\0world\0".to_vec();
        let blob = Blob::new(data.clone());
        assert_eq!(blob.serialize_content(), data.as_slice());
    }
}
