//! Decoding synthetic segments of both layouts

mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use hwshm::{
        error::INACTIVE_SIGNATURE,
        layout::{
            ADJACENCY_GROUP_SIZE, ADJACENCY_HEADER_SIZE, ADJACENCY_READING_SIZE, LABEL_LEN,
            OFFSET_TABLE_GROUP_SIZE,
        },
        project_segment, DecodeLimits, LayoutVariant, SegmentDecoder, ShmError, TelemetrySnapshot,
    };

    #[test]
    fn test_adjacency_reading_count_matches_groups() {
        let bytes = adjacency_segment(&[
            AdjGroup::new(0xF000_0100, 0, vec![AdjReading::new(1, 1.0), AdjReading::new(2, 2.0)]),
            AdjGroup::new(0xF000_0200, 0, vec![]),
            AdjGroup::new(0xF000_0300, 1, (1..=7).map(|r| AdjReading::new(r, r as f64)).collect()),
        ]);
        let segment = SegmentDecoder::new(&bytes, LayoutVariant::Adjacency, &DecodeLimits::default())
            .unwrap()
            .decode()
            .unwrap();

        let stored: u32 = segment
            .groups
            .iter()
            .map(|g| g.group.reading_count().unwrap())
            .sum();
        assert_eq!(stored, 9);
        assert_eq!(segment.reading_count(), 9);
        assert_eq!(project_segment(&segment).len(), 9);
    }

    #[test]
    fn test_offset_table_example_scenario() {
        let bytes = offset_table_segment(
            &[OtSensor::new(100, 0, "CPU")],
            &[OtReading::new(0, 5000, "CPU Package Power", "W", 42.5)],
            0,
        );
        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();

        assert_eq!(snapshot.len(), 1);
        let reading = &snapshot.readings[0];
        assert_eq!(reading.group_id, 100);
        assert_eq!(reading.group_instance, 0);
        assert_eq!(reading.group_label, "CPU");
        assert_eq!(reading.reading_id, 5000);
        assert_eq!(reading.value, 42.5);
        assert_eq!(reading.unit, "W");
        assert!(snapshot.issues.is_empty());
    }

    #[test]
    fn test_offset_table_readings_resolve_to_valid_groups() {
        let sensors = vec![
            OtSensor::new(1, 0, "CPU"),
            OtSensor::new(2, 0, "GPU"),
            OtSensor::new(3, 0, "Drive"),
        ];
        let readings = vec![
            OtReading::new(2, 30, "Temperature", "°C", 38.0),
            OtReading::new(0, 10, "Core Clock", "MHz", 4800.0),
            OtReading::new(1, 20, "GPU Power", "W", 120.0),
            OtReading::new(0, 11, "CPU Package Power", "W", 65.0),
        ];
        let bytes = offset_table_segment(&sensors, &readings, 0);
        let decoder =
            SegmentDecoder::new(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default()).unwrap();
        let header_count = decoder.header().reading_count().unwrap();
        let segment = decoder.decode().unwrap();

        assert_eq!(header_count as usize, segment.reading_count());
        assert!(segment.orphans.is_empty());

        let projected = project_segment(&segment);
        let ids: Vec<u32> = projected.iter().map(|r| r.reading_id).collect();
        assert_eq!(ids, vec![10, 11, 20, 30]);
        assert!(projected.iter().all(|r| (1..=3).contains(&r.group_id)));
    }

    #[test]
    fn test_out_of_range_group_index_is_isolated() {
        let bytes = offset_table_segment(
            &[OtSensor::new(100, 0, "CPU")],
            &[
                OtReading::new(0, 1, "Before", "W", 1.0),
                OtReading::new(1, 2, "Broken", "W", 2.0),
                OtReading::new(0, 3, "After", "W", 3.0),
            ],
            0,
        );
        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.issues.len(), 1);
        assert!(matches!(
            snapshot.issues[0],
            ShmError::MalformedRecord {
                index: 1,
                group_index: 1,
                group_count: 1
            }
        ));

        let orphan = snapshot.readings.last().unwrap();
        assert!(orphan.is_orphan());
        assert_eq!(orphan.label, "Broken");
        assert_eq!(snapshot.readings[1].label, "After");
    }

    #[test]
    fn test_wider_strides_are_honored() {
        let bytes = offset_table_segment(
            &[OtSensor::new(7, 2, "Board")],
            &[
                OtReading::new(0, 1, "Vcore", "V", 1.25),
                OtReading::new(0, 2, "+12V", "V", 12.1),
            ],
            24,
        );
        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.readings[1].value, 12.1);
        assert_eq!(snapshot.readings[1].group_instance, 2);
    }

    #[test]
    fn test_stride_smaller_than_record_is_rejected() {
        let mut bytes = cpu_power_segment();
        // Sensor element size field follows signature, version, revision and poll time.
        bytes[24..28].copy_from_slice(&16u32.to_le_bytes());
        let err = SegmentDecoder::new(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ShmError::StrideTooSmall {
                element_size: 16,
                record_size: OFFSET_TABLE_GROUP_SIZE,
                ..
            }
        ));
        assert!(err.is_structural());
    }

    #[test]
    fn test_empty_offset_table_with_zero_strides() {
        let mut bytes = offset_table_segment(&[], &[], 0);
        // Sensor and reading element sizes left at zero by the producer.
        bytes[24..28].copy_from_slice(&0u32.to_le_bytes());
        bytes[36..40].copy_from_slice(&0u32.to_le_bytes());

        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.issues.is_empty());
        assert_eq!(snapshot.header.group_count(), 0);
    }

    #[test]
    fn test_signature_mismatch_yields_nothing() {
        let bytes = cpu_power_segment();
        let err = SegmentDecoder::new(&bytes, LayoutVariant::Adjacency, &DecodeLimits::default())
            .unwrap_err();
        assert!(matches!(err, ShmError::SignatureMismatch { .. }));
        assert!(err.is_structural());
        assert!(!err.is_retryable());

        let mut garbage = uniform_adjacency(2, 2);
        garbage[..4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        for variant in [LayoutVariant::Adjacency, LayoutVariant::OffsetTable] {
            assert!(matches!(
                TelemetrySnapshot::from_bytes(&garbage, variant, &DecodeLimits::default()),
                Err(ShmError::SignatureMismatch { actual: 0x1234_5678, .. })
            ));
        }
    }

    #[test]
    fn test_inactive_segment_is_retryable() {
        let mut bytes = cpu_power_segment();
        bytes[..4].copy_from_slice(&INACTIVE_SIGNATURE.to_le_bytes());
        let err = SegmentDecoder::new(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_reading_count_beyond_ceiling_is_truncated() {
        let bytes = uniform_adjacency(3, 2);
        let group_span = ADJACENCY_GROUP_SIZE + 2 * ADJACENCY_READING_SIZE;
        let limits =
            DecodeLimits::default().with_max_segment_bytes(ADJACENCY_HEADER_SIZE + group_span + 8);

        let decoder = SegmentDecoder::new(&bytes, LayoutVariant::Adjacency, &limits).unwrap();
        let mut walk = decoder.groups();
        assert!(walk.next().unwrap().is_ok());
        assert!(matches!(walk.next(), Some(Err(ShmError::Truncated { .. }))));
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_garbage_reading_count_does_not_wrap() {
        let mut bytes = uniform_adjacency(2, 1);
        let count_offset = ADJACENCY_HEADER_SIZE + 8;
        bytes[count_offset..count_offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = SegmentDecoder::new(&bytes, LayoutVariant::Adjacency, &DecodeLimits::default())
            .unwrap()
            .decode()
            .unwrap_err();
        assert!(matches!(err, ShmError::Truncated { .. }));
    }

    #[test]
    fn test_group_count_limit() {
        let bytes = uniform_adjacency(5, 0);
        let limits = DecodeLimits::default().with_max_groups(4);
        let err = SegmentDecoder::new(&bytes, LayoutVariant::Adjacency, &limits).unwrap_err();
        assert!(matches!(err, ShmError::CountTooLarge { count: 5, limit: 4, .. }));
    }

    #[test]
    fn test_unterminated_label_stays_in_field() {
        let mut reading = OtReading::new(0, 1, "", "W", 1.0);
        reading.label = vec![b'A'; LABEL_LEN];
        reading.label_user = b"next field".to_vec();
        let bytes = offset_table_segment(&[OtSensor::new(1, 0, "CPU")], &[reading], 0);

        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();
        let projected = &snapshot.readings[0];
        assert_eq!(projected.label.len(), LABEL_LEN);
        assert!(projected.label.chars().all(|c| c == 'A'));
        assert_eq!(projected.label_user, "next field");
    }

    #[test]
    fn test_invalid_utf8_label_is_replaced() {
        let mut reading = OtReading::new(0, 1, "", "\u{b0}C", 55.0);
        reading.label = vec![0xFF, 0xFE, b'T', b'j'];
        let mut sensor = OtSensor::new(1, 0, "");
        sensor.label = vec![b'C', b'P', b'U', 0xC3];
        let bytes = offset_table_segment(&[sensor], &[reading], 0);

        let snapshot =
            TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default())
                .unwrap();
        let projected = &snapshot.readings[0];
        assert_eq!(projected.label, "\u{FFFD}\u{FFFD}Tj");
        assert_eq!(projected.group_label, "CPU\u{FFFD}");
        assert_eq!(projected.unit, "°C");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = offset_table_segment(
            &[OtSensor::new(1, 0, "CPU"), OtSensor::new(2, 0, "GPU")],
            &[
                OtReading::new(1, 20, "GPU Temperature", "°C", 61.0),
                OtReading::new(0, 10, "CPU Package Power", "W", 42.5),
            ],
            0,
        );
        let limits = DecodeLimits::default();
        let first = TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &limits).unwrap();
        let second = TelemetrySnapshot::from_bytes(&bytes, LayoutVariant::OffsetTable, &limits).unwrap();
        assert_eq!(first.readings, second.readings);
    }

    #[test]
    fn test_sections_decode_independently() {
        let bytes = offset_table_segment(
            &[OtSensor::new(1, 0, "CPU"), OtSensor::new(2, 0, "GPU")],
            &[OtReading::new(1, 20, "GPU Power", "W", 120.0)],
            0,
        );
        let decoder =
            SegmentDecoder::new(&bytes, LayoutVariant::OffsetTable, &DecodeLimits::default()).unwrap();
        let (sensors, readings) = decoder.sections().unwrap();

        let readings: Vec<_> = readings.map(Result::unwrap).collect();
        let sensors: Vec<_> = sensors.map(Result::unwrap).collect();
        assert_eq!(readings.len(), 1);
        assert_eq!(sensors[readings[0].group_index as usize].id, 2);
    }
}
