//! H264Probe: a parameter-set-aware stand-in for a video decoder.
//!
//! The viewer has no pixel pipeline.  What it can do cheaply is read the
//! sequence parameter set (SPS) of each H.264 stream and report the coded
//! picture size for every frame that carries a slice, which is exactly what
//! the display needs to size its surface.
//!
//! # SPS layout (for beginners)
//!
//! An SPS NAL unit is a bit stream, not a byte stream.  Most fields are
//! *exp-Golomb* codes: `n` leading zero bits, a one bit, then `n` more bits.
//! Before parsing, every `00 00 03` sequence must have its `03` removed; the
//! encoder inserts it so the payload never contains a start code.
//!
//! The picture size is stored in macroblocks (16x16) with an optional
//! cropping rectangle, so 1080p is coded as 1088 rows cropped by 8.

use mow_core::protocol::annexb::{is_slice, nal_unit_type, split_nal_units, NAL_IDR_SLICE, NAL_SPS};
use mow_core::EncodedFrame;
use tracing::info;

use crate::application::codec::{CodecError, DecodedPicture, VideoCodec};

/// Profiles whose SPS carries chroma format and bit depth fields.
const HIGH_PROFILES: &[u8] = &[100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Reports picture dimensions for Annex-B H.264 frames.
#[derive(Debug, Default)]
pub struct H264Probe {
    configured: bool,
    size: Option<(u32, u32)>,
}

impl H264Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensions from the most recent SPS.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

impl VideoCodec for H264Probe {
    fn configure(&mut self, codec: &str) -> Result<(), CodecError> {
        if !(codec.starts_with("avc1.") || codec.starts_with("avc3.")) {
            return Err(CodecError::UnsupportedCodec(codec.to_string()));
        }
        self.configured = true;
        Ok(())
    }

    fn decode(&mut self, frame: &EncodedFrame) -> Result<Option<DecodedPicture>, CodecError> {
        if !self.configured {
            return Err(CodecError::NotConfigured);
        }

        let nals = split_nal_units(&frame.bytes);
        if nals.is_empty() {
            return Err(CodecError::Malformed(format!(
                "no Annex-B start code in {} bytes",
                frame.len()
            )));
        }

        let mut has_slice = false;
        let mut keyframe = false;
        for nal in nals {
            match nal_unit_type(nal) {
                NAL_SPS => {
                    let size = parse_sps_dimensions(nal)?;
                    if self.size != Some(size) {
                        info!("stream dimensions {}x{}", size.0, size.1);
                        self.size = Some(size);
                    }
                }
                t if is_slice(t) => {
                    has_slice = true;
                    keyframe |= t == NAL_IDR_SLICE;
                }
                _ => {}
            }
        }

        if !has_slice {
            return Ok(None);
        }
        let (width, height) = self.size.ok_or_else(|| {
            CodecError::Malformed("picture data before any sequence parameter set".to_string())
        })?;
        Ok(Some(DecodedPicture {
            width,
            height,
            timestamp_us: frame.timestamp_us,
            keyframe,
        }))
    }
}

// ── SPS parsing ───────────────────────────────────────────────────────────────

/// Strips emulation-prevention bytes (`00 00 03` becomes `00 00`).
pub fn remove_emulation_prevention(nal: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nal.len());
    let mut zeros = 0usize;
    for &byte in nal {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bit(&mut self) -> Result<u32, CodecError> {
        let byte = self
            .data
            .get(self.pos / 8)
            .ok_or_else(|| CodecError::Malformed("sequence parameter set is truncated".to_string()))?;
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    fn bits(&mut self, n: u32) -> Result<u32, CodecError> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.bit()?;
        }
        Ok(value)
    }

    fn flag(&mut self) -> Result<bool, CodecError> {
        Ok(self.bit()? == 1)
    }

    /// Unsigned exp-Golomb.
    fn ue(&mut self) -> Result<u32, CodecError> {
        let mut leading = 0u32;
        while self.bit()? == 0 {
            leading += 1;
            if leading > 31 {
                return Err(CodecError::Malformed("exp-Golomb code too long".to_string()));
            }
        }
        let suffix = self.bits(leading)?;
        Ok(((1u64 << leading) - 1 + u64::from(suffix)) as u32)
    }

    /// Signed exp-Golomb.
    fn se(&mut self) -> Result<i32, CodecError> {
        let k = i64::from(self.ue()?);
        let value = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Ok(value as i32)
    }
}

fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> Result<(), CodecError> {
    let mut last = 8i32;
    let mut next = 8i32;
    for _ in 0..size {
        if next != 0 {
            let delta = r.se()?;
            if !(-128..=127).contains(&delta) {
                return Err(CodecError::Malformed(format!(
                    "delta_scale {delta} out of range"
                )));
            }
            next = (last + delta).rem_euclid(256);
        }
        if next != 0 {
            last = next;
        }
    }
    Ok(())
}

/// Reads the cropped picture size from an SPS NAL unit (header included).
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the SPS is truncated or its sizes do
/// not fit, and [`CodecError::Unsupported`] for a chroma format above 4:4:4.
pub fn parse_sps_dimensions(nal: &[u8]) -> Result<(u32, u32), CodecError> {
    let rbsp = remove_emulation_prevention(nal.get(1..).unwrap_or_default());
    let mut r = BitReader::new(&rbsp);

    let profile_idc = r.bits(8)? as u8;
    r.bits(8)?; // constraint flags
    r.bits(8)?; // level_idc
    r.ue()?; // seq_parameter_set_id

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    if HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = r.ue()?;
        if chroma_format_idc > 3 {
            return Err(CodecError::Unsupported(format!(
                "chroma_format_idc {chroma_format_idc}"
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane = r.flag()?;
        }
        r.ue()?; // bit_depth_luma_minus8
        r.ue()?; // bit_depth_chroma_minus8
        r.flag()?; // qpprime_y_zero_transform_bypass_flag
        if r.flag()? {
            let lists = if chroma_format_idc == 3 { 12 } else { 8 };
            for i in 0..lists {
                if r.flag()? {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    r.ue()?; // log2_max_frame_num_minus4
    match r.ue()? {
        0 => {
            r.ue()?; // log2_max_pic_order_cnt_lsb_minus4
        }
        1 => {
            r.flag()?; // delta_pic_order_always_zero_flag
            r.se()?; // offset_for_non_ref_pic
            r.se()?; // offset_for_top_to_bottom_field
            for _ in 0..r.ue()? {
                r.se()?;
            }
        }
        _ => {}
    }
    r.ue()?; // max_num_ref_frames
    r.flag()?; // gaps_in_frame_num_value_allowed_flag

    let width_mbs = u64::from(r.ue()?) + 1;
    let height_map_units = u64::from(r.ue()?) + 1;
    let frame_mbs_only = r.flag()?;
    if !frame_mbs_only {
        r.flag()?; // mb_adaptive_frame_field_flag
    }
    r.flag()?; // direct_8x8_inference_flag

    let field_factor: u64 = if frame_mbs_only { 1 } else { 2 };
    let mut width = width_mbs * 16;
    let mut height = height_map_units * 16 * field_factor;

    if r.flag()? {
        let (left, right, top, bottom) = (r.ue()?, r.ue()?, r.ue()?, r.ue()?);
        let chroma_array_type = if separate_colour_plane { 0 } else { chroma_format_idc };
        let (crop_x, crop_y) = match chroma_array_type {
            0 => (1, field_factor),
            1 => (2, 2 * field_factor),
            2 => (2, field_factor),
            _ => (1, field_factor),
        };
        let crop_w = crop_x * (u64::from(left) + u64::from(right));
        let crop_h = crop_y * (u64::from(top) + u64::from(bottom));
        if crop_w >= width || crop_h >= height {
            return Err(CodecError::Malformed("cropping exceeds picture size".to_string()));
        }
        width -= crop_w;
        height -= crop_h;
    }

    let width = u32::try_from(width)
        .map_err(|_| CodecError::Malformed("picture width out of range".to_string()))?;
    let height = u32::try_from(height)
        .map_err(|_| CodecError::Malformed("picture height out of range".to_string()))?;
    Ok((width, height))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal bit writer for building parameter sets in tests.
    #[derive(Default)]
    struct BitWriter {
        bytes: Vec<u8>,
        bit: u8,
    }

    impl BitWriter {
        fn put(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                if self.bit == 0 {
                    self.bytes.push(0);
                }
                let b = ((value >> i) & 1) as u8;
                if let Some(last) = self.bytes.last_mut() {
                    *last |= b << (7 - self.bit);
                }
                self.bit = (self.bit + 1) % 8;
            }
        }

        fn ue(&mut self, value: u32) {
            let v = value + 1;
            let len = 32 - v.leading_zeros();
            self.put(0, len - 1);
            self.put(v, len);
        }

        /// Adds the RBSP stop bit and emulation-prevention bytes.
        fn finish(mut self) -> Vec<u8> {
            self.put(1, 1);
            let mut out = Vec::new();
            let mut zeros = 0;
            for b in self.bytes {
                if zeros >= 2 && b <= 3 {
                    out.push(3);
                    zeros = 0;
                }
                zeros = if b == 0 { zeros + 1 } else { 0 };
                out.push(b);
            }
            out
        }
    }

    /// A baseline SPS for `width_mbs` x `height_mbs` with an optional
    /// bottom crop (in crop units).
    fn baseline_sps(width_mbs: u32, height_mbs: u32, crop_bottom: Option<u32>) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.put(66, 8); // profile_idc: baseline
        w.put(0xC0, 8);
        w.put(30, 8); // level 3.0
        w.ue(0); // sps id
        w.ue(0); // log2_max_frame_num_minus4
        w.ue(0); // poc type
        w.ue(2); // log2_max_poc_lsb_minus4
        w.ue(1); // max_num_ref_frames
        w.put(0, 1);
        w.ue(width_mbs - 1);
        w.ue(height_mbs - 1);
        w.put(1, 1); // frame_mbs_only
        w.put(1, 1); // direct_8x8
        match crop_bottom {
            Some(bottom) => {
                w.put(1, 1);
                w.ue(0);
                w.ue(0);
                w.ue(0);
                w.ue(bottom);
            }
            None => w.put(0, 1),
        }
        w.put(0, 1); // no VUI
        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    fn high_sps_1080p() -> Vec<u8> {
        let mut w = BitWriter::default();
        w.put(100, 8); // profile_idc: high
        w.put(0, 8);
        w.put(40, 8);
        w.ue(0);
        w.ue(1); // chroma_format_idc 4:2:0
        w.ue(0);
        w.ue(0);
        w.put(0, 1);
        w.put(0, 1); // no scaling matrix
        w.ue(0);
        w.ue(1); // poc type 1
        w.put(0, 1);
        w.ue(2); // offset_for_non_ref_pic = -1
        w.ue(0);
        w.ue(1); // one ref frame in cycle
        w.ue(1);
        w.ue(4);
        w.put(0, 1);
        w.ue(119);
        w.ue(67);
        w.put(1, 1);
        w.put(1, 1);
        w.put(1, 1);
        w.ue(0);
        w.ue(0);
        w.ue(0);
        w.ue(4);
        w.put(0, 1);
        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    /// A 320x240 high-profile SPS whose first 4x4 scaling list is present.
    /// `delta_code` is the raw ue(v) code of every delta_scale in that list.
    fn high_sps_with_scaling_delta(delta_code: u32) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.put(100, 8); // profile_idc: high
        w.put(0, 8);
        w.put(30, 8);
        w.ue(0);
        w.ue(1); // chroma_format_idc 4:2:0
        w.ue(0);
        w.ue(0);
        w.put(0, 1);
        w.put(1, 1); // seq_scaling_matrix_present
        w.put(1, 1); // list 0 present
        for _ in 0..16 {
            w.ue(delta_code);
        }
        for _ in 1..8 {
            w.put(0, 1);
        }
        w.ue(0);
        w.ue(0); // poc type 0
        w.ue(0);
        w.ue(1);
        w.put(0, 1);
        w.ue(19);
        w.ue(14);
        w.put(1, 1);
        w.put(1, 1);
        w.put(0, 1); // no cropping
        w.put(0, 1);
        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    fn annexb(nals: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for nal in nals {
            out.extend_from_slice(&[0, 0, 0, 1]);
            out.extend_from_slice(nal);
        }
        out
    }

    fn configured() -> H264Probe {
        let mut probe = H264Probe::new();
        probe.configure("avc1.42E01E").expect("configure");
        probe
    }

    #[test]
    fn test_emulation_prevention_bytes_are_removed() {
        assert_eq!(remove_emulation_prevention(&[0, 0, 3, 1]), vec![0, 0, 1]);
        assert_eq!(remove_emulation_prevention(&[0, 0, 3, 0, 0, 3]), vec![0, 0, 0, 0]);
        assert_eq!(remove_emulation_prevention(&[1, 0, 3, 2]), vec![1, 0, 3, 2]);
    }

    #[test]
    fn test_parse_uncropped_baseline_sps() {
        let sps = baseline_sps(40, 30, None);
        assert_eq!(parse_sps_dimensions(&sps), Ok((640, 480)));
    }

    #[test]
    fn test_parse_cropped_baseline_sps() {
        // 800x608 coded, cropped by 8 rows to 800x600
        let sps = baseline_sps(50, 38, Some(4));
        assert_eq!(parse_sps_dimensions(&sps), Ok((800, 600)));
    }

    #[test]
    fn test_parse_high_profile_1080p() {
        assert_eq!(parse_sps_dimensions(&high_sps_1080p()), Ok((1920, 1080)));
    }

    #[test]
    fn test_high_profile_with_flat_scaling_list_parses() {
        // delta 0 everywhere keeps the list at its default of 8
        let sps = high_sps_with_scaling_delta(0);
        assert_eq!(parse_sps_dimensions(&sps), Ok((320, 240)));
    }

    #[test]
    fn test_scaling_delta_beyond_range_is_malformed() {
        // Arrange: delta_scale of i32::MAX, far outside -128..=127
        let sps = high_sps_with_scaling_delta(u32::MAX - 2);

        // Act
        let result = parse_sps_dimensions(&sps);

        // Assert
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_truncated_sps_is_malformed() {
        let sps = baseline_sps(40, 30, None);
        let result = parse_sps_dimensions(&sps[..4]);
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_configure_rejects_non_avc() {
        let mut probe = H264Probe::new();
        assert_eq!(
            probe.configure("vp8"),
            Err(CodecError::UnsupportedCodec("vp8".to_string()))
        );
    }

    #[test]
    fn test_decode_before_configure_fails() {
        let mut probe = H264Probe::new();
        let frame = EncodedFrame::key(annexb(&[&[0x65, 0x88]]), 0);
        assert_eq!(probe.decode(&frame), Err(CodecError::NotConfigured));
    }

    #[test]
    fn test_keyframe_with_sps_reports_picture() {
        // Arrange
        let mut probe = configured();
        let sps = baseline_sps(50, 38, Some(4));
        let frame = EncodedFrame::key(annexb(&[&sps, &[0x68, 0xCE], &[0x65, 0x88, 0x80]]), 77);

        // Act
        let picture = probe.decode(&frame).expect("decode");

        // Assert
        assert_eq!(
            picture,
            Some(DecodedPicture {
                width: 800,
                height: 600,
                timestamp_us: 77,
                keyframe: true,
            })
        );
    }

    #[test]
    fn test_delta_frame_reuses_known_dimensions() {
        let mut probe = configured();
        let sps = baseline_sps(40, 30, None);
        probe
            .decode(&EncodedFrame::key(annexb(&[&sps, &[0x65, 0x88]]), 0))
            .expect("first frame");

        let picture = probe
            .decode(&EncodedFrame::key(annexb(&[&[0x41, 0x9A]]), 16_000))
            .expect("second frame")
            .expect("a picture");

        assert_eq!((picture.width, picture.height), (640, 480));
        assert!(!picture.keyframe);
    }

    #[test]
    fn test_parameter_sets_alone_produce_no_picture() {
        let mut probe = configured();
        let sps = baseline_sps(40, 30, None);
        let result = probe.decode(&EncodedFrame::key(annexb(&[&sps]), 0));
        assert_eq!(result, Ok(None));
        assert_eq!(probe.size(), Some((640, 480)));
    }

    #[test]
    fn test_slice_before_sps_is_malformed() {
        let mut probe = configured();
        let result = probe.decode(&EncodedFrame::key(annexb(&[&[0x65, 0x88]]), 0));
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_bytes_without_start_code_are_malformed() {
        let mut probe = configured();
        let result = probe.decode(&EncodedFrame::key(vec![0xDE, 0xAD], 0));
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }
}
