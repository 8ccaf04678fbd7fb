//! H.264 Annex-B byte-stream helpers.
//!
//! Encoded video is carried as an Annex-B byte stream: NAL units separated by
//! start codes.
//!
//! ```text
//! 00 00 00 01 [NAL] 00 00 01 [NAL] 00 00 00 01 [NAL] ...
//! ```
//!
//! The ingest layer never looks inside frames.  These helpers are used by the
//! producer (to cut a file into one message per picture) and by the viewer's
//! stream probe.

/// The 4-byte start code written in front of every NAL unit we emit.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// NAL unit type of a coded slice of a non-IDR picture.
pub const NAL_SLICE: u8 = 1;
/// NAL unit type of a coded slice of an IDR picture.
pub const NAL_IDR_SLICE: u8 = 5;
/// NAL unit type of a sequence parameter set.
pub const NAL_SPS: u8 = 7;
/// NAL unit type of a picture parameter set.
pub const NAL_PPS: u8 = 8;

/// Splits an Annex-B byte stream into NAL unit payloads (start codes removed).
///
/// Both 3-byte (`00 00 01`) and 4-byte (`00 00 00 01`) start codes are
/// recognised.  Bytes before the first start code are ignored, so input
/// without any start code yields no NAL units.
pub fn split_nal_units(bytes: &[u8]) -> Vec<&[u8]> {
    // (position of the start code, position of the first payload byte)
    let mut marks: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i + 3 <= bytes.len() {
        if bytes[i] == 0 && bytes[i + 1] == 0 && bytes[i + 2] == 1 {
            marks.push((i, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut nals = Vec::with_capacity(marks.len());
    for (idx, &(_, payload_start)) in marks.iter().enumerate() {
        let mut end = marks
            .get(idx + 1)
            .map(|&(start_code, _)| start_code)
            .unwrap_or(bytes.len());
        // Trailing zeros belong to the next 4-byte start code or are padding.
        while end > payload_start && bytes[end - 1] == 0 {
            end -= 1;
        }
        if end > payload_start {
            nals.push(&bytes[payload_start..end]);
        }
    }
    nals
}

/// Returns the `nal_unit_type` field (low 5 bits of the header byte).
pub fn nal_unit_type(nal: &[u8]) -> u8 {
    nal.first().map(|header| header & 0x1F).unwrap_or(0)
}

/// Returns `true` for coded slice NAL units (types 1 through 5).
pub fn is_slice(nal_type: u8) -> bool {
    (NAL_SLICE..=NAL_IDR_SLICE).contains(&nal_type)
}

/// `first_mb_in_slice` is the first ue(v) of the slice header; it is zero
/// exactly when the first bit after the NAL header is set.
fn starts_new_picture(nal: &[u8]) -> bool {
    nal.get(1).map(|b| b & 0x80 != 0).unwrap_or(true)
}

/// Groups an Annex-B stream into access units, one per coded picture.
///
/// Parameter sets and other non-slice NAL units are attached to the picture
/// that follows them.  Additional slices of the same picture stay in the same
/// access unit.  Every NAL unit is re-emitted behind a 4-byte start code.
/// Trailing NAL units with no following slice are dropped.
pub fn group_access_units(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut units = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut current_has_slice = false;

    for nal in split_nal_units(bytes) {
        let slice = is_slice(nal_unit_type(nal));
        let continues_picture = slice && !starts_new_picture(nal);

        if current_has_slice && !continues_picture {
            units.push(std::mem::take(&mut current));
            current_has_slice = false;
        }

        current.extend_from_slice(&START_CODE);
        current.extend_from_slice(nal);
        current_has_slice |= slice;
    }

    if current_has_slice {
        units.push(current);
    }
    units
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal NAL units: header byte plus one payload byte.
    const SPS: [u8; 2] = [0x67, 0x42];
    const PPS: [u8; 2] = [0x68, 0xCE];
    const IDR: [u8; 2] = [0x65, 0x88];
    const P_SLICE: [u8; 2] = [0x41, 0x9A];

    fn stream(nals: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for nal in nals {
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nal);
        }
        out
    }

    #[test]
    fn test_split_handles_three_and_four_byte_start_codes() {
        // Arrange
        let bytes = [0, 0, 0, 1, 0x67, 0x42, 0, 0, 1, 0x68, 0xCE];

        // Act
        let nals = split_nal_units(&bytes);

        // Assert
        assert_eq!(nals, vec![&[0x67, 0x42][..], &[0x68, 0xCE][..]]);
    }

    #[test]
    fn test_split_without_start_code_is_empty() {
        assert!(split_nal_units(&[0x65, 0x88, 0x84]).is_empty());
        assert!(split_nal_units(&[]).is_empty());
    }

    #[test]
    fn test_split_ignores_leading_garbage() {
        let bytes = [0xFF, 0xEE, 0, 0, 1, 0x65, 0x88];
        assert_eq!(split_nal_units(&bytes), vec![&[0x65, 0x88][..]]);
    }

    #[test]
    fn test_nal_unit_type_reads_low_bits() {
        assert_eq!(nal_unit_type(&SPS), NAL_SPS);
        assert_eq!(nal_unit_type(&PPS), NAL_PPS);
        assert_eq!(nal_unit_type(&IDR), NAL_IDR_SLICE);
        assert_eq!(nal_unit_type(&P_SLICE), NAL_SLICE);
        assert_eq!(nal_unit_type(&[]), 0);
    }

    #[test]
    fn test_group_attaches_parameter_sets_to_next_picture() {
        // Arrange: SPS PPS IDR | P | P
        let bytes = stream(&[&SPS, &PPS, &IDR, &P_SLICE, &P_SLICE]);

        // Act
        let units = group_access_units(&bytes);

        // Assert
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], stream(&[&SPS, &PPS, &IDR]));
        assert_eq!(units[1], stream(&[&P_SLICE]));
        assert_eq!(units[2], stream(&[&P_SLICE]));
    }

    #[test]
    fn test_group_keeps_multi_slice_picture_together() {
        // Second slice has first_mb_in_slice != 0 (top bit clear).
        let second_slice = [0x41, 0x1A];
        let bytes = stream(&[&IDR, &second_slice, &P_SLICE]);

        let units = group_access_units(&bytes);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0], stream(&[&IDR, &second_slice]));
    }

    #[test]
    fn test_group_drops_trailing_parameter_sets() {
        let bytes = stream(&[&IDR, &SPS, &PPS]);
        let units = group_access_units(&bytes);
        assert_eq!(units, vec![stream(&[&IDR])]);
    }
}
