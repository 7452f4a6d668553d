//! YCbCr 4:2:2 plane split and merge.
//!
//! The interleaved layout stores two pixels per 4-byte group, `[Y0 Cb Y1 Cr]`.
//! Each plane compresses independently, so the codec splits the interleave
//! into Y / Cb / Cr byte runs and merges them back on decode.

/// Plane count per frame.
pub(crate) const NUM_PLANES: usize = 3;

/// Y plane index.
pub(crate) const PLANE_Y: usize = 0;

/// Byte length of one plane for the given geometry.
pub(crate) fn plane_len(plane: usize, width: usize, height: usize) -> usize {
    if plane == PLANE_Y {
        width * height
    } else {
        (width / 2) * height
    }
}

/// Copy one plane out of the interleaved video payload.
pub(crate) fn extract_plane(video: &[u8], plane: usize, out: &mut Vec<u8>) {
    out.clear();
    match plane {
        PLANE_Y => {
            for group in video.chunks_exact(4) {
                out.push(group[0]);
                out.push(group[2]);
            }
        }
        1 => out.extend(video.chunks_exact(4).map(|g| g[1])),
        _ => out.extend(video.chunks_exact(4).map(|g| g[3])),
    }
}

/// Write one plane back into the interleaved video payload.
pub(crate) fn insert_plane(video: &mut [u8], plane: usize, data: &[u8]) {
    match plane {
        PLANE_Y => {
            for (group, pair) in video.chunks_exact_mut(4).zip(data.chunks_exact(2)) {
                group[0] = pair[0];
                group[2] = pair[1];
            }
        }
        1 => {
            for (group, &value) in video.chunks_exact_mut(4).zip(data) {
                group[1] = value;
            }
        }
        _ => {
            for (group, &value) in video.chunks_exact_mut(4).zip(data) {
                group[3] = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_merge_identity() {
        let video: Vec<u8> = (0u16..64).map(|v| (v * 7) as u8).collect();
        let mut merged = vec![0u8; video.len()];
        let mut plane = Vec::new();
        for p in 0..NUM_PLANES {
            extract_plane(&video, p, &mut plane);
            assert_eq!(plane.len(), plane_len(p, 8, 4));
            insert_plane(&mut merged, p, &plane);
        }
        assert_eq!(merged, video);
    }
}
