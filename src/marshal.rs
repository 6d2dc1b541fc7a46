//! Windowed copies between host buffers and owned storage.
//!
//! Both directions use the same offset semantic: `offset` indexes the
//! owned buffer, the host-side buffer always starts at element zero.
//! Windows are clipped to the owned length, never extended, except for byte
//! strings which grow to fit.

use std::ffi::c_int;

use crate::error::{trap, DatarefError};

/// Number of elements a window of `count` at `offset` covers in `len`.
pub fn window_len(len: usize, offset: usize, count: usize) -> usize {
    count.min(len.saturating_sub(offset))
}

/// Copy `src[offset..]` into `dest`, returning the number copied.
pub fn copy_window_out<E: Copy>(src: &[E], dest: &mut [E], offset: usize) -> usize {
    let n = window_len(src.len(), offset, dest.len());
    dest[..n].copy_from_slice(&src[offset..offset + n]);
    n
}

/// Copy `src` into `dst[offset..]`, returning the number copied.
pub fn copy_window_in<E: Copy>(dst: &mut [E], src: &[E], offset: usize) -> usize {
    let n = window_len(dst.len(), offset, src.len());
    dst[offset..offset + n].copy_from_slice(&src[..n]);
    n
}

/// The bytes before the first NUL.
pub fn terminated(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Replace `owned[offset..]` with `src` up to its first NUL.
///
/// `src` goes through a scratch copy with a forced terminator, so a host
/// buffer without one is cut at its stated length. Offsets past the end are
/// clamped so the string never gains a gap.
pub fn splice_bytes(owned: &mut Vec<u8>, src: &[u8], offset: usize) {
    let mut scratch = Vec::with_capacity(src.len() + 1);
    scratch.extend_from_slice(src);
    scratch.push(0);

    let offset = offset.min(owned.len());
    owned.truncate(offset);
    owned.extend_from_slice(terminated(&scratch));
}

/// Convert a host offset argument. Negative offsets are a host bug.
#[track_caller]
pub fn offset_arg(offset: c_int) -> usize {
    match usize::try_from(offset) {
        Ok(offset) => offset,
        Err(_) => trap(DatarefError::NegativeOffset { offset }),
    }
}

/// Convert a host count argument. Negative counts copy nothing.
pub fn count_arg(count: c_int) -> usize {
    usize::try_from(count).unwrap_or(0)
}

/// Convert a length for return to the host.
pub fn len_ret(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_len_clips() {
        assert_eq!(window_len(25, 0, 25), 25);
        assert_eq!(window_len(25, 20, 10), 5);
        assert_eq!(window_len(25, 25, 1), 0);
        assert_eq!(window_len(25, 100, 1), 0);
        assert_eq!(window_len(25, 3, 0), 0);
    }

    #[test]
    fn test_copy_window_out() {
        let src: Vec<i32> = (0..10).collect();
        let mut dest = [0; 4];
        assert_eq!(copy_window_out(&src, &mut dest, 3), 4);
        assert_eq!(dest, [3, 4, 5, 6]);

        let mut dest = [-1; 4];
        assert_eq!(copy_window_out(&src, &mut dest, 8), 2);
        assert_eq!(dest, [8, 9, -1, -1]);

        assert_eq!(copy_window_out(&src, &mut dest, 10), 0);
    }

    #[test]
    fn test_copy_window_in() {
        let mut dst = [0.0f32; 5];
        assert_eq!(copy_window_in(&mut dst, &[1.0, 2.0], 1), 2);
        assert_eq!(dst, [0.0, 1.0, 2.0, 0.0, 0.0]);

        assert_eq!(copy_window_in(&mut dst, &[7.0, 8.0, 9.0], 3), 2);
        assert_eq!(dst, [0.0, 1.0, 2.0, 7.0, 8.0]);

        assert_eq!(copy_window_in(&mut dst, &[1.0], 5), 0);
    }

    #[test]
    fn test_terminated() {
        assert_eq!(terminated(b"abc\0def"), b"abc");
        assert_eq!(terminated(b"abc"), b"abc");
        assert_eq!(terminated(b"\0"), b"");
    }

    #[test]
    fn test_splice_bytes_replaces_from_offset() {
        let mut owned = b"abcdef".to_vec();
        splice_bytes(&mut owned, b"XY", 2);
        assert_eq!(owned, b"abXY");

        let mut owned = b"abc".to_vec();
        splice_bytes(&mut owned, b"123", 0);
        assert_eq!(owned, b"123");
    }

    #[test]
    fn test_splice_bytes_repairs_termination() {
        let mut owned = Vec::new();
        splice_bytes(&mut owned, b"abc\0garbage", 0);
        assert_eq!(owned, b"abc");

        // offset past the end appends instead of leaving a gap
        let mut owned = b"ab".to_vec();
        splice_bytes(&mut owned, b"cd", 10);
        assert_eq!(owned, b"abcd");
    }

    #[test]
    fn test_count_arg() {
        assert_eq!(count_arg(-5), 0);
        assert_eq!(count_arg(5), 5);
        assert_eq!(len_ret(3), 3);
    }

    #[test]
    #[should_panic(expected = "Negative offset -1")]
    fn test_negative_offset_traps() {
        offset_arg(-1);
    }
}
