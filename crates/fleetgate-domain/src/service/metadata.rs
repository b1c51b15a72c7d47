use fleetgate_storage::Metadata;

/// Shallow merge: incoming top-level keys overwrite, all others are kept.
///
/// Nested objects are replaced as a whole, not merged.
pub fn merge_metadata(current: &mut Metadata, incoming: Metadata) {
    for (key, value) in incoming {
        current.insert(key, value);
    }
}
