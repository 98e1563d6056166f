// src/locate.rs
use crate::coords::CoordinateTable;
use crate::error::{CurateError, Result};
use crate::tracks::{TrackTable, FIRST_FRAME_COLUMN};

/// Where a track first shows up in its video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackLocation {
    pub track: i64,
    pub frame: i64,
    pub x: i64,
    pub y: i64,
}

/// Look up the first frame of `track` in the tracker summary and its
/// coordinates in that frame.
pub fn locate_track(summary: &TrackTable, coords: &CoordinateTable, track: i64) -> Result<TrackLocation> {
    let x_col = format!("X{track}");
    let y_col = format!("Y{track}");
    if !coords.has_column(&x_col) || !coords.has_column(&y_col) {
        return Err(CurateError::KeyNotFound(format!(
            "Track {track} not found in the video and respective data."
        )));
    }

    let first = summary
        .value(track, FIRST_FRAME_COLUMN)
        .filter(|f| f.is_finite())
        .ok_or_else(|| CurateError::KeyNotFound(format!("No frame data found for track {track}.")))?;
    let frame = first as i64;

    let row = coords
        .row_for_frame(frame)
        .ok_or_else(|| CurateError::KeyNotFound(format!("Frame {frame} of track {track} has no coordinates.")))?;

    Ok(TrackLocation {
        track,
        frame,
        x: coords.value(row, &x_col).unwrap_or(0),
        y: coords.value(row, &y_col).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::parse_coordinates;

    fn fixtures() -> (TrackTable, CoordinateTable) {
        let mut summary = TrackTable::new(
            ["#Frames", "1stFrame", "time(s)", "Bends"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        summary.insert(1, vec![3.0, 2.0, 1.0, 1.0]);
        summary.insert(2, vec![3.0, 9.0, 1.0, 1.0]);
        summary.insert(3, vec![3.0, f64::NAN, 1.0, 1.0]);

        let coords = parse_coordinates(
            "Tracks 1 to 3\n\
             1\t0\t0\t0\t0\t0\t0\t0\t0\t0\n\
             2\t15\t25\t1\t0\t0\t0\t0\t0\t0\n\
             3\t16\t26\t1\t7\t8\t1\t0\t0\t0\n"
                .lines(),
        )
        .unwrap();
        (summary, coords)
    }

    #[test]
    fn test_locate_first_frame() {
        let (summary, coords) = fixtures();
        let loc = locate_track(&summary, &coords, 1).unwrap();
        assert_eq!(loc, TrackLocation { track: 1, frame: 2, x: 15, y: 25 });
    }

    #[test]
    fn test_unknown_track_column() {
        let (summary, coords) = fixtures();
        let err = locate_track(&summary, &coords, 4).unwrap_err();
        assert!(matches!(err, CurateError::KeyNotFound(ref m) if m.contains("Track 4")));
    }

    #[test]
    fn test_frame_outside_coordinates() {
        let (summary, coords) = fixtures();
        assert!(matches!(
            locate_track(&summary, &coords, 2),
            Err(CurateError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_missing_first_frame() {
        let (summary, coords) = fixtures();
        let err = locate_track(&summary, &coords, 3).unwrap_err();
        assert!(matches!(err, CurateError::KeyNotFound(ref m) if m.contains("No frame data")));
    }
}
