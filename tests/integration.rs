use std::fs;
use std::path::Path;

use swim_curator::aggregate::aggregate_experiment;
use swim_curator::export::{BBPM_COLUMN, LONG_TRACKS_SHEET};
use swim_curator::tracks::TrackTable;
use swim_curator::workbook::{read_column, read_workbook};
use swim_curator::{FrameSurface, Notifier, ReviewConfig, Reviewer, Severity};
use tempfile::TempDir;

#[derive(Default)]
struct Alerts(Vec<(Severity, String, String)>);

impl Notifier for Alerts {
    fn notify(&mut self, severity: Severity, title: &str, message: &str) {
        self.0.push((severity, title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
struct Screen(Vec<(i64, Option<(i64, i64)>)>);

impl FrameSurface for Screen {
    fn show_frame(&mut self, frame: i64, highlight: Option<(i64, i64)>) {
        self.0.push((frame, highlight));
    }
}

const SUMMARY: &str = "Track\t#Frames\t1stFrame\ttime(s)\tBends\n\
                       1\t10\t1\t5\t20\n\
                       2\t8\t2\t5\t10\n\
                       5\t40\t0\t20\t80\n";

fn coordinates() -> String {
    let mut out = String::from("Tracks 1 to 3\n");
    for frame in 0..3 {
        out.push_str(&format!("{frame}\t{}\t{}\t1\t{}\t{}\t1\t0\t0\t0\n", 10 + frame, 20 + frame, 30 + frame, 40 + frame));
    }
    out.push_str("Tracks 4 to 5\n");
    for frame in 0..3 {
        out.push_str(&format!("{frame}\t0\t0\t0\t{}\t{}\t1\n", 50 + frame, 60 + frame));
    }
    out
}

fn add_video(folder: &Path, base: &str) {
    fs::write(folder.join(format!("{base}_labels_compressed.AVI")), b"").unwrap();
    fs::write(folder.join(format!("{base}_tracks.txt")), SUMMARY).unwrap();
    fs::write(folder.join(format!("{base}_tracks_raw.txt")), coordinates()).unwrap();
}

fn reviewer() -> Reviewer<Alerts> {
    Reviewer::new(ReviewConfig::default(), Alerts::default())
}

fn table_rows(reviewer: &Reviewer<Alerts>) -> Vec<i64> {
    reviewer.table().map(|t| t.ids().collect()).unwrap_or_default()
}

#[test]
fn test_review_session_end_to_end() {
    let dir = TempDir::new().unwrap();
    let line = dir.path().join("control").join("line1");
    fs::create_dir_all(&line).unwrap();
    add_video(&line, "w01");
    add_video(&line, "w02");

    let mut r = reviewer();
    assert!(r.open_folder(&line));
    assert_eq!(r.status(), "(Video 1 of 2)");
    assert_eq!(table_rows(&r), vec![1, 2, 5]);

    assert!(r.combine("1, 2"));
    let combined = r.table().unwrap().row(1).unwrap().to_vec();
    assert_eq!(combined, vec![18.0, 3.0, 10.0, 30.0]);
    assert!(r.delete("5"));
    assert_eq!(table_rows(&r), vec![1]);

    assert!(r.undo());
    assert_eq!(table_rows(&r), vec![1, 5]);
    assert!(r.undo());
    assert_eq!(table_rows(&r), vec![1, 5]);

    let log = fs::read_to_string(line.join("tracks_processed").join("w01_log.txt")).unwrap();
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        vec![
            "Tracks 1, 2 combined to Track 1!",
            "Track(s) 5 deleted!",
            "Last step undone.",
            "Last step undone.",
        ]
    );

    let working = TrackTable::read_checkpoint(&line.join("w01_tracks.txt.temp.csv")).unwrap();
    assert_eq!(working.ids().collect::<Vec<_>>(), vec![1, 5]);

    assert!(r.save_and_proceed());
    assert_eq!(r.status(), "(Video 2 of 2)");
    assert_eq!(r.current().unwrap().paths.base_name, "w02");

    let exported = line.join("tracks_processed").join("w01_processed.xlsx");
    let workbook = read_workbook(&exported).unwrap();
    let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![LONG_TRACKS_SHEET, "all_swimming_cycles", "all_data"]);
    // times 10 and 20: only track 5 is strictly above half the longest
    assert_eq!(read_column(&exported, BBPM_COLUMN).unwrap(), vec!["240"]);
    let all = workbook.sheet("all_swimming_cycles").unwrap().column(BBPM_COLUMN).unwrap();
    assert_eq!(all, vec!["180", "240"]);

    assert!(r.save_and_proceed());
    assert_eq!(r.status(), "All videos have been processed.");
    assert!(r.current().is_none());
    let (severity, title, message) = r.notifier().0.last().unwrap();
    assert_eq!(*severity, Severity::Info);
    assert_eq!(title, "Completed");
    assert_eq!(message, "All videos have been processed.");

    let results = aggregate_experiment(dir.path(), r.config()).unwrap();
    assert_eq!(results, vec![line.join("line1_results.xlsx")]);
    let aggregated = read_workbook(&results[0]).unwrap();
    assert_eq!(aggregated.sheets()[0].name, "line1");
    assert_eq!(read_column(&results[0], "w01_processed.xlsx").unwrap(), vec!["240"]);
    assert_eq!(read_column(&results[0], "w02_processed.xlsx").unwrap(), vec!["240"]);
}

#[test]
fn test_save_twice_reports_no_data() {
    let dir = TempDir::new().unwrap();
    add_video(dir.path(), "w01");

    let mut r = reviewer();
    assert!(r.open_folder(dir.path()));
    assert!(r.save());
    assert!(!r.save());
    let (severity, title, _) = r.notifier().0.last().unwrap();
    assert_eq!(*severity, Severity::Warning);
    assert_eq!(title, "No Track Data");

    assert!(!r.combine("1,2"));
    assert_eq!(r.notifier().0.last().unwrap().2, "Please load a track first.");
}

#[test]
fn test_reopening_resumes_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    add_video(dir.path(), "w01");

    let mut r = reviewer();
    assert!(r.open_folder(dir.path()));
    assert!(r.delete("2"));

    let mut again = reviewer();
    assert!(again.open_folder(dir.path()));
    assert_eq!(table_rows(&again), vec![1, 5]);
}

#[test]
fn test_rejected_edits_leave_table_alone() {
    let dir = TempDir::new().unwrap();
    add_video(dir.path(), "w01");

    let mut r = reviewer();
    assert!(r.open_folder(dir.path()));
    assert!(!r.delete("2, 999"));
    assert!(!r.combine("1, 4"));
    assert!(!r.combine("one"));
    assert_eq!(table_rows(&r), vec![1, 2, 5]);

    let titles: Vec<&str> = r.notifier().0.iter().map(|(_, t, _)| t.as_str()).collect();
    assert_eq!(titles, vec!["Track Not Found", "Track Not Found", "Invalid Input"]);
    assert!(!dir.path().join("tracks_processed").join("w01_log.txt").exists());
}

#[test]
fn test_find_track_highlights_first_position() {
    let dir = TempDir::new().unwrap();
    add_video(dir.path(), "w01");

    let mut r = reviewer();
    assert!(r.open_folder(dir.path()));

    let mut screen = Screen::default();
    let loc = r.find_track("2", &mut screen).unwrap();
    assert_eq!((loc.frame, loc.x, loc.y), (2, 32, 42));
    assert_eq!(screen.0, vec![(2, Some((32, 42)))]);

    let loc = r.find_track(" 5 ", &mut screen).unwrap();
    assert_eq!((loc.frame, loc.x, loc.y), (0, 50, 60));

    assert!(r.find_track("7", &mut screen).is_none());
    assert!(r.find_track("x", &mut screen).is_none());
    assert_eq!(screen.0.len(), 2);
}

#[test]
fn test_bad_coordinate_file_is_reported() {
    let dir = TempDir::new().unwrap();
    add_video(dir.path(), "w01");
    fs::write(dir.path().join("w01_tracks_raw.txt"), "Tracks one to five\n1\t2\t3\t4\n").unwrap();

    let mut r = reviewer();
    assert!(!r.open_folder(dir.path()));
    let (severity, title, _) = r.notifier().0.last().unwrap();
    assert_eq!(*severity, Severity::Error);
    assert_eq!(title, "Coordinate File Error");
}
