//! Built-in video clip: a red square growing out of the top-left corner and
//! shrinking back, on black.
//!
//! Every picture is a standalone IDR access unit (SPS, PPS, one slice) whose
//! macroblocks are all `I_PCM`, i.e. raw 4:2:0 samples.  No encoder is
//! involved, so a picture is large (384 bytes per macroblock) but any
//! baseline H.264 decoder accepts it.

use std::f64::consts::PI;

use mow_core::protocol::annexb::START_CODE;

/// Picture width in pixels.
pub const WIDTH: u32 = 128;
/// Picture height in pixels.
pub const HEIGHT: u32 = 96;
/// Pictures in one grow-and-shrink cycle.
pub const FRAMES: usize = 60;

const MB: u32 = 16;
const MB_TYPE_I_PCM: u32 = 25;
const SLICE_TYPE_I: u32 = 7;

#[derive(Debug, Clone, Copy)]
struct Yuv {
    y: u8,
    cb: u8,
    cr: u8,
}

// BT.601 limited range.
const BLACK: Yuv = Yuv {
    y: 16,
    cb: 128,
    cr: 128,
};
const RED: Yuv = Yuv {
    y: 81,
    cb: 90,
    cr: 240,
};

/// The clip as Annex-B access units, one per picture, in display order.
pub fn access_units() -> Vec<Vec<u8>> {
    let sps = nal(0x67, sequence_parameter_set());
    let pps = nal(0x68, picture_parameter_set());
    (0..FRAMES)
        .map(|frame| {
            let mut unit = Vec::with_capacity(sps.len() + pps.len() + slice_capacity());
            unit.extend_from_slice(&sps);
            unit.extend_from_slice(&pps);
            unit.extend(nal(0x65, idr_slice(frame, square_side(frame))));
            unit
        })
        .collect()
}

/// Side of the square in pixels: zero at the start of the cycle, the full
/// picture height half way through.
fn square_side(frame: usize) -> u32 {
    let phase = (frame as f64 / FRAMES as f64 * PI).sin().abs();
    (f64::from(HEIGHT.min(WIDTH)) * phase).round() as u32
}

fn slice_capacity() -> usize {
    ((WIDTH / MB) * (HEIGHT / MB)) as usize * 385 + 16
}

fn sequence_parameter_set() -> Vec<u8> {
    let mut w = BitWriter::default();
    w.bits(66, 8); // profile_idc: baseline
    w.bits(0xC0, 8); // constraint_set0 and constraint_set1
    w.bits(30, 8); // level 3.0
    w.ue(0); // seq_parameter_set_id
    w.ue(0); // log2_max_frame_num_minus4
    w.ue(2); // pic_order_cnt_type: output order is decode order
    w.ue(1); // max_num_ref_frames
    w.flag(false); // gaps_in_frame_num_value_allowed_flag
    w.ue(WIDTH / MB - 1);
    w.ue(HEIGHT / MB - 1);
    w.flag(true); // frame_mbs_only_flag
    w.flag(true); // direct_8x8_inference_flag
    w.flag(false); // frame_cropping_flag
    w.flag(false); // vui_parameters_present_flag
    w.finish()
}

fn picture_parameter_set() -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // pic_parameter_set_id
    w.ue(0); // seq_parameter_set_id
    w.flag(false); // entropy_coding_mode_flag: CAVLC
    w.flag(false); // bottom_field_pic_order_in_frame_present_flag
    w.ue(0); // num_slice_groups_minus1
    w.ue(0); // num_ref_idx_l0_default_active_minus1
    w.ue(0); // num_ref_idx_l1_default_active_minus1
    w.flag(false); // weighted_pred_flag
    w.bits(0, 2); // weighted_bipred_idc
    w.ue(0); // pic_init_qp_minus26 = se(0)
    w.ue(0); // pic_init_qs_minus26 = se(0)
    w.ue(0); // chroma_qp_index_offset = se(0)
    w.flag(true); // deblocking_filter_control_present_flag
    w.flag(false); // constrained_intra_pred_flag
    w.flag(false); // redundant_pic_cnt_present_flag
    w.finish()
}

fn idr_slice(frame: usize, side: u32) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // first_mb_in_slice
    w.ue(SLICE_TYPE_I);
    w.ue(0); // pic_parameter_set_id
    w.bits(0, 4); // frame_num
    // Neighbouring IDR pictures must not share an idr_pic_id.
    w.ue((frame % 2) as u32);
    w.flag(false); // no_output_of_prior_pics_flag
    w.flag(false); // long_term_reference_flag
    w.ue(0); // slice_qp_delta = se(0)
    w.ue(1); // disable_deblocking_filter_idc

    for mb_y in 0..HEIGHT / MB {
        for mb_x in 0..WIDTH / MB {
            w.ue(MB_TYPE_I_PCM);
            w.align();
            pcm_samples(&mut w, mb_x * MB, mb_y * MB, side);
        }
    }
    w.finish()
}

/// Luma in raster order, then the Cb block, then the Cr block.
fn pcm_samples(w: &mut BitWriter, x0: u32, y0: u32, side: u32) {
    let colour = |x: u32, y: u32| if x < side && y < side { RED } else { BLACK };
    for y in y0..y0 + MB {
        for x in x0..x0 + MB {
            w.byte(colour(x, y).y);
        }
    }
    let chroma: [fn(Yuv) -> u8; 2] = [|c| c.cb, |c| c.cr];
    for pick in chroma {
        for y in (y0..y0 + MB).step_by(2) {
            for x in (x0..x0 + MB).step_by(2) {
                w.byte(pick(colour(x, y)));
            }
        }
    }
}

/// Start code, NAL header, then the RBSP with emulation prevention applied.
fn nal(header: u8, rbsp: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 5);
    out.extend_from_slice(&START_CODE);
    out.push(header);
    let mut zeros = 0usize;
    for byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

/// MSB-first bit writer for RBSP payloads.
#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    /// Bits already used in the last byte; 0 when byte-aligned.
    used: u8,
}

impl BitWriter {
    fn bits(&mut self, value: u64, n: u32) {
        for i in (0..n).rev() {
            if self.used == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                if let Some(last) = self.bytes.last_mut() {
                    *last |= 0x80 >> self.used;
                }
            }
            self.used = (self.used + 1) % 8;
        }
    }

    fn flag(&mut self, on: bool) {
        self.bits(u64::from(on), 1);
    }

    fn byte(&mut self, value: u8) {
        self.bits(u64::from(value), 8);
    }

    /// Unsigned exp-Golomb.
    fn ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let len = 64 - code.leading_zeros();
        self.bits(0, len - 1);
        self.bits(code, len);
    }

    /// Pads with zero bits up to the next byte boundary.
    fn align(&mut self) {
        self.used = 0;
    }

    /// Appends the RBSP stop bit and trailing alignment.
    fn finish(mut self) -> Vec<u8> {
        self.flag(true);
        self.align();
        self.bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
