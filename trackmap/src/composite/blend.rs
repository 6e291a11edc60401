//! Straight-alpha "source over" blending of RGBA8 pixels.

/// Blends `src` over `dst` in place. Both are straight (non-premultiplied)
/// RGBA8.
#[inline]
pub fn blend_pixel_over(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as u32;
    if sa == 255 {
        dst[..4].copy_from_slice(&src[..4]);
        return;
    }
    if sa == 0 {
        return;
    }

    let da = dst[3] as u32;
    let inv = 255 - sa;
    // Output alpha scaled by 255.
    let out_a = sa * 255 + da * inv;
    if out_a == 0 {
        dst[..4].fill(0);
        return;
    }
    for c in 0..3 {
        let num = src[c] as u32 * sa * 255 + dst[c] as u32 * da * inv;
        dst[c] = ((num + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

/// Blends a whole scanline. Rows must have equal length.
pub fn blend_row_over(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        blend_pixel_over(d, s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
        let mut out = dst;
        blend_pixel_over(&mut out, &src);
        out
    }

    #[test]
    fn test_opaque_source_replaces() {
        assert_eq!(over([1, 2, 3, 255], [9, 8, 7, 255]), [9, 8, 7, 255]);
    }

    #[test]
    fn test_transparent_source_keeps_destination() {
        assert_eq!(over([1, 2, 3, 200], [9, 8, 7, 0]), [1, 2, 3, 200]);
    }

    #[test]
    fn test_half_alpha_over_opaque_white() {
        let out = over([255, 255, 255, 255], [0, 0, 0, 128]);
        assert_eq!(out[3], 255);
        assert!((126..=128).contains(&out[0]), "got {:?}", out);
    }

    #[test]
    fn test_over_transparent_keeps_source_color() {
        // Straight alpha: color is not darkened by an empty destination.
        assert_eq!(over([0, 0, 0, 0], [200, 100, 50, 100]), [200, 100, 50, 100]);
    }

    #[test]
    fn test_alpha_accumulates() {
        let out = over([0, 0, 255, 128], [255, 0, 0, 128]);
        // 128 + 128 * (127/255) ≈ 192
        assert!((191..=193).contains(&out[3]), "got {:?}", out);
        assert!(out[0] > out[2], "source dominates: {:?}", out);
    }

    #[test]
    fn test_row_blend() {
        let mut dst = vec![0, 0, 0, 0, 10, 10, 10, 255];
        blend_row_over(&mut dst, &[5, 5, 5, 255, 0, 0, 0, 0]);
        assert_eq!(dst, vec![5, 5, 5, 255, 10, 10, 10, 255]);
    }
}
