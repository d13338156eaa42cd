//! Targeted lookup over adjacency-layout segments

mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use hwshm::{LookupKey, ShmError, TargetedLookup};

    #[test]
    fn test_lookup_at_group_two_reading_three() {
        let bytes = uniform_adjacency(4, 5);
        let mut lookup = TargetedLookup::default();

        // Fourth reading (index 3) of the second group.
        let found = lookup
            .find_in(&bytes, LookupKey::new(2, 0, 4))
            .unwrap()
            .expect("reading should be present");
        assert_eq!(found.value, 204.0);
        assert_eq!(found.min, 203.0);
        assert_eq!(found.max, 205.0);

        let stats = lookup.stats();
        assert_eq!(stats.groups_visited, 2);
        assert_eq!(stats.readings_inspected, 4);
    }

    #[test]
    fn test_absent_key_visits_every_group_once() {
        let bytes = uniform_adjacency(6, 3);
        let mut lookup = TargetedLookup::default();

        assert!(lookup.find_in(&bytes, LookupKey::new(2, 0, 99)).unwrap().is_none());
        assert_eq!(lookup.stats().groups_visited, 6);
        assert_eq!(lookup.stats().readings_inspected, 3);

        assert!(lookup.find_in(&bytes, LookupKey::new(42, 0, 1)).unwrap().is_none());
        assert_eq!(lookup.stats().groups_visited, 6);
        assert_eq!(lookup.stats().readings_inspected, 0);
    }

    #[test]
    fn test_lookup_agrees_with_full_decode() {
        let bytes = uniform_adjacency(3, 4);
        let snapshot = hwshm::TelemetrySnapshot::from_bytes(
            &bytes,
            hwshm::LayoutVariant::Adjacency,
            &hwshm::DecodeLimits::default(),
        )
        .unwrap();

        let mut lookup = TargetedLookup::default();
        for expected in &snapshot.readings {
            let key = LookupKey::new(expected.group_id, expected.group_instance, expected.reading_id);
            assert_eq!(lookup.find_in(&bytes, key).unwrap().as_ref(), Some(expected));
        }
    }

    #[test]
    fn test_structural_failure_is_not_a_miss() {
        let mut bytes = uniform_adjacency(3, 2);
        bytes.truncate(bytes.len() - 10);
        let err = TargetedLookup::default()
            .find_in(&bytes, LookupKey::new(3, 0, 2))
            .unwrap_err();
        assert!(matches!(err, ShmError::Truncated { .. }));
    }

    #[test]
    fn test_offset_table_segment_is_rejected() {
        let err = TargetedLookup::default()
            .find_in(&cpu_power_segment(), LookupKey::new(100, 0, 5000))
            .unwrap_err();
        assert!(matches!(err, ShmError::SignatureMismatch { .. }));
    }
}
