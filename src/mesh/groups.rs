//! Decoding of exporter group ranges into per-face group ids.
//!
//! CAD exporters attach groups to a mesh as a flat `[start, count, start,
//! count, ...]` array plus one face id per range. Depending on the exporter
//! version the ranges index either faces or loops (face corners), and the data
//! does not say which. Both interpretations are decoded and the one that assigns
//! a group to more faces wins.

use std::collections::HashMap;

use super::index::GroupId;

/// What the `start`/`count` pairs of a range array index into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeIndexMode {
    /// Ranges are face index spans.
    Faces,
    /// Ranges are loop (face corner) index spans.
    Loops,
}

/// One decoded `(start, count)` range with its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupRange {
    start: usize,
    count: usize,
    group: GroupId,
}

fn parse_ranges(flat: &[i64], face_ids: &[u64]) -> Vec<GroupRange> {
    let range_count = (flat.len() / 2).min(face_ids.len());
    let mut ranges: Vec<GroupRange> = (0..range_count)
        .filter_map(|i| {
            let start = flat[i * 2];
            let count = flat[i * 2 + 1];
            if start < 0 || count <= 0 {
                return None;
            }
            Some(GroupRange {
                start: start as usize,
                count: count as usize,
                group: GroupId::new(face_ids[i]),
            })
        })
        .collect();
    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Guess whether a range array indexes faces or loops.
pub fn detect_index_mode(flat: &[i64], num_faces: usize, num_loops: usize) -> RangeIndexMode {
    if flat.is_empty() {
        return RangeIndexMode::Loops;
    }

    let mut counts_total = 0i64;
    let mut max_end = 0i64;
    for pair in flat.chunks(2) {
        let start = pair[0];
        let count = pair.get(1).copied().unwrap_or(0);
        counts_total += count;
        max_end = max_end.max(start + count);
    }

    if max_end <= num_faces as i64 {
        RangeIndexMode::Faces
    } else if max_end <= num_loops as i64 {
        RangeIndexMode::Loops
    } else if counts_total == num_faces as i64 {
        RangeIndexMode::Faces
    } else {
        RangeIndexMode::Loops
    }
}

fn face_map(ranges: &[GroupRange], num_faces: usize) -> Vec<Option<GroupId>> {
    let mut out = vec![None; num_faces];
    for r in ranges {
        let end = (r.start + r.count).min(num_faces);
        for slot in out.iter_mut().take(end).skip(r.start) {
            if slot.is_none() {
                *slot = Some(r.group);
            }
        }
    }
    out
}

fn loop_map(ranges: &[GroupRange], face_sizes: &[usize]) -> Vec<Option<GroupId>> {
    let num_loops: usize = face_sizes.iter().sum();
    let mut loop_groups = vec![None; num_loops];
    for r in ranges {
        let end = (r.start + r.count).min(num_loops);
        for slot in loop_groups.iter_mut().take(end).skip(r.start) {
            if slot.is_none() {
                *slot = Some(r.group);
            }
        }
    }

    // Majority vote over each face's corners; the first group to reach the
    // winning count keeps the face.
    let mut out = Vec::with_capacity(face_sizes.len());
    let mut loop_start = 0;
    for &size in face_sizes {
        let mut counts: HashMap<GroupId, usize> = HashMap::new();
        let mut best: Option<GroupId> = None;
        let mut best_count = 0;
        for group in loop_groups[loop_start..loop_start + size].iter().flatten() {
            let c = counts.entry(*group).or_insert(0);
            *c += 1;
            if *c > best_count {
                best_count = *c;
                best = Some(*group);
            }
        }
        out.push(best);
        loop_start += size;
    }
    out
}

fn coverage(map: &[Option<GroupId>]) -> usize {
    map.iter().filter(|g| g.is_some()).count()
}

/// Decode an exporter range array into one optional group per face.
///
/// # Arguments
/// * `flat` - `[start, count, ...]` pairs as written by the exporter
/// * `face_ids` - one exporter face id per range
/// * `face_sizes` - corner count of every mesh face, in face order
///
/// Ranges with a negative start or non-positive count are ignored. When a face
/// is covered by several ranges, the range with the lowest start wins.
pub fn decode_group_ranges(
    flat: &[i64],
    face_ids: &[u64],
    face_sizes: &[usize],
) -> Vec<Option<GroupId>> {
    let num_faces = face_sizes.len();
    if flat.is_empty() || face_ids.is_empty() || num_faces == 0 {
        return vec![None; num_faces];
    }

    let ranges = parse_ranges(flat, face_ids);
    if ranges.is_empty() {
        return vec![None; num_faces];
    }

    let num_loops: usize = face_sizes.iter().sum();
    let by_face = face_map(&ranges, num_faces);
    let by_loop = loop_map(&ranges, face_sizes);

    let (primary, secondary) = match detect_index_mode(flat, num_faces, num_loops) {
        RangeIndexMode::Faces => (by_face, by_loop),
        RangeIndexMode::Loops => (by_loop, by_face),
    };

    if coverage(&secondary) > coverage(&primary) {
        log::debug!("group ranges decoded with the secondary index mode");
        secondary
    } else {
        primary
    }
}
