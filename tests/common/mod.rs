//! Builders for synthetic telemetry segments

#![allow(dead_code)]

use hwshm::layout::{
    ADJACENCY_SIGNATURE, LABEL_LEN, OFFSET_TABLE_GROUP_SIZE, OFFSET_TABLE_HEADER_SIZE,
    OFFSET_TABLE_READING_SIZE, OFFSET_TABLE_SIGNATURE, UNIT_LEN,
};

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_f64(bytes: &mut Vec<u8>, value: f64) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_text(bytes: &mut Vec<u8>, text: &[u8], len: usize) {
    let mut field = vec![0u8; len];
    let n = text.len().min(len);
    field[..n].copy_from_slice(&text[..n]);
    bytes.extend_from_slice(&field);
}

/// Adjacency-layout reading
#[derive(Debug, Clone)]
pub struct AdjReading {
    pub id: u32,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl AdjReading {
    pub fn new(id: u32, value: f64) -> Self {
        Self {
            id,
            value,
            min: value - 1.0,
            max: value + 1.0,
        }
    }
}

/// Adjacency-layout group
#[derive(Debug, Clone)]
pub struct AdjGroup {
    pub id: u32,
    pub instance: u32,
    pub readings: Vec<AdjReading>,
}

impl AdjGroup {
    pub fn new(id: u32, instance: u32, readings: Vec<AdjReading>) -> Self {
        Self {
            id,
            instance,
            readings,
        }
    }
}

/// Adjacency segment: header, then each group followed by its readings
pub fn adjacency_segment(groups: &[AdjGroup]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [ADJACENCY_SIGNATURE, 2, 1, 2000, groups.len() as u32] {
        push_u32(&mut bytes, field);
    }
    for group in groups {
        for field in [group.id, group.instance, group.readings.len() as u32, 0] {
            push_u32(&mut bytes, field);
        }
        for reading in &group.readings {
            for field in [group.id, group.instance, reading.id, 0] {
                push_u32(&mut bytes, field);
            }
            push_f64(&mut bytes, reading.value);
            push_f64(&mut bytes, reading.min);
            push_f64(&mut bytes, reading.max);
            bytes.extend_from_slice(&[0u8; 32]);
        }
    }
    bytes
}

/// `count` groups of `per_group` readings each; group ids start at 1
pub fn uniform_adjacency(count: u32, per_group: u32) -> Vec<u8> {
    let groups: Vec<AdjGroup> = (1..=count)
        .map(|id| {
            let readings = (1..=per_group)
                .map(|r| AdjReading::new(r, (id * 100 + r) as f64))
                .collect();
            AdjGroup::new(id, 0, readings)
        })
        .collect();
    adjacency_segment(&groups)
}

/// Offset-table sensor record
#[derive(Debug, Clone)]
pub struct OtSensor {
    pub id: u32,
    pub instance: u32,
    pub label: Vec<u8>,
    pub label_user: Vec<u8>,
}

impl OtSensor {
    pub fn new(id: u32, instance: u32, label: &str) -> Self {
        Self {
            id,
            instance,
            label: label.as_bytes().to_vec(),
            label_user: Vec::new(),
        }
    }
}

/// Offset-table reading record
#[derive(Debug, Clone)]
pub struct OtReading {
    pub reading_type: u32,
    pub group_index: u32,
    pub id: u32,
    pub label: Vec<u8>,
    pub label_user: Vec<u8>,
    pub unit: Vec<u8>,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl OtReading {
    pub fn new(group_index: u32, id: u32, label: &str, unit: &str, value: f64) -> Self {
        Self {
            reading_type: 1,
            group_index,
            id,
            label: label.as_bytes().to_vec(),
            label_user: Vec::new(),
            unit: unit.as_bytes().to_vec(),
            value,
            min: value,
            max: value,
            avg: value,
        }
    }
}

/// Offset-table segment with the sensor section right after the header and
/// the reading section after that. `padding` is added to both strides.
pub fn offset_table_segment(sensors: &[OtSensor], readings: &[OtReading], padding: usize) -> Vec<u8> {
    let sensor_stride = OFFSET_TABLE_GROUP_SIZE + padding;
    let reading_stride = OFFSET_TABLE_READING_SIZE + padding;
    let sensor_offset = OFFSET_TABLE_HEADER_SIZE;
    let reading_offset = sensor_offset + sensor_stride * sensors.len();

    let mut bytes = Vec::new();
    for field in [OFFSET_TABLE_SIGNATURE, 2, 1] {
        push_u32(&mut bytes, field);
    }
    bytes.extend_from_slice(&1_700_000_000i64.to_le_bytes());
    for field in [
        sensor_offset as u32,
        sensor_stride as u32,
        sensors.len() as u32,
        reading_offset as u32,
        reading_stride as u32,
        readings.len() as u32,
    ] {
        push_u32(&mut bytes, field);
    }

    for sensor in sensors {
        push_u32(&mut bytes, sensor.id);
        push_u32(&mut bytes, sensor.instance);
        push_text(&mut bytes, &sensor.label, LABEL_LEN);
        push_text(&mut bytes, &sensor.label_user, LABEL_LEN);
        bytes.extend(std::iter::repeat(0xAA).take(padding));
    }
    for reading in readings {
        for field in [reading.reading_type, reading.group_index, reading.id] {
            push_u32(&mut bytes, field);
        }
        push_text(&mut bytes, &reading.label, LABEL_LEN);
        push_text(&mut bytes, &reading.label_user, LABEL_LEN);
        push_text(&mut bytes, &reading.unit, UNIT_LEN);
        for v in [reading.value, reading.min, reading.max, reading.avg] {
            push_f64(&mut bytes, v);
        }
        bytes.extend(std::iter::repeat(0xAA).take(padding));
    }
    bytes
}

/// One CPU sensor with a package power reading
pub fn cpu_power_segment() -> Vec<u8> {
    offset_table_segment(
        &[OtSensor::new(100, 0, "CPU [#0]: Intel Core i7")],
        &[OtReading::new(0, 5000, "CPU Package Power", "W", 42.5)],
        0,
    )
}
