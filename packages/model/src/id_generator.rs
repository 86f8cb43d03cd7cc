use crc32fast::Hasher;

/// Generate a document seed from the owning record id using CRC32
pub fn document_seed(pub_id: &str) -> String {
    let mut buff = String::from(pub_id);
    if !pub_id.starts_with("pub://") {
        buff = format!("pub://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes within a document
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Document seed (CRC32 of the owning record id)
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn new(pub_id: &str) -> Self {
        Self {
            seed: document_seed(pub_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Get document seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

/// Generate a fresh identifier for a record created from the editor.
///
/// Node ids are deterministic per document; record ids must be unique
/// across the whole host installation, hence the uuid.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_is_stable() {
        let id1 = document_seed("pub-abc");
        let id2 = document_seed("pub-abc");

        // Same record always generates same seed
        assert_eq!(id1, id2);

        // Different records generate different seeds
        let id3 = document_seed("pub-def");
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("pub-abc");

        let id1 = gen.new_id();
        let id2 = gen.new_id();
        let id3 = gen.new_id();

        // IDs are sequential
        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id3.ends_with("-3"));

        // All share same seed
        let seed = gen.seed();
        assert!(id1.starts_with(seed));
        assert!(id2.starts_with(seed));
        assert!(id3.starts_with(seed));
    }

    #[test]
    fn test_record_ids_are_unique() {
        assert_ne!(new_record_id(), new_record_id());
    }
}
