//! Scanner fixtures run through libtest-mimic.
//!
//! Built-in trials paint synthetic frames. Set `PIXWATCH_FIXTURES` to a
//! directory of `<name>.dump` captures, each next to a `<name>.json` of the
//! form `{ "signatures": {..}, "expect": { "sig": {"x":..,"y":..} | null } }`,
//! to replay real captures as extra trials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use libtest_mimic::{Arguments, Failed, Trial};
use pixwatch_core::dump::{load_dump, read_dump, write_dump};
use pixwatch_core::index::SignatureIndex;
use pixwatch_core::scanner::scan;
use pixwatch_core::signature::{Direction, SignatureSet};
use pixwatch_core::types::{Capture, Point, Rgb};

const BG: Rgb = Rgb::new(12, 12, 12);
const SEQ: [Rgb; 4] = [
    Rgb::new(219, 79, 79),
    Rgb::new(200, 74, 74),
    Rgb::new(83, 80, 218),
    Rgb::new(255, 255, 255),
];

fn check<T: PartialEq + std::fmt::Debug>(got: T, want: T) -> Result<(), Failed> {
    if got == want {
        Ok(())
    } else {
        Err(format!("got {:?}, want {:?}", got, want).into())
    }
}

fn paint(cap: &mut Capture, at: (u32, u32), direction: Direction) {
    for (i, c) in SEQ.iter().enumerate() {
        let i = i as u32;
        match direction {
            Direction::RowMajor => cap.set_pixel(at.0 + i, at.1, *c),
            Direction::ColumnMajor => cap.set_pixel(at.0, at.1 + i, *c),
        }
    }
}

fn index_of(name: &str, direction: Direction, offset: Point) -> SignatureIndex {
    let set = SignatureSet::builder()
        .add(name, SEQ.to_vec(), direction, offset)
        .build()
        .expect("fixture signature");
    SignatureIndex::build(&set).expect("fixture index")
}

fn synthetic() -> Vec<Trial> {
    let mut trials = Vec::new();

    // Embedded sequence is found at its coordinate plus offset, at every
    // position of a small grid.
    for (x, y) in [(0, 0), (3, 7), (28, 0), (0, 15), (20, 11)] {
        trials.push(Trial::test(format!("embedded_row_at_{}_{}", x, y), move || {
            let index = index_of("bar", Direction::RowMajor, Point::new(-1, 2));
            let mut cap = Capture::filled(32, 16, BG);
            paint(&mut cap, (x, y), Direction::RowMajor);
            check(scan(&cap, &index).get("bar"), Some(Point::new(x as i32 - 1, y as i32 + 2)))
        }));
    }

    trials.push(Trial::test("no_false_positives", || {
        let index = index_of("bar", Direction::RowMajor, Point::default());
        let mut cap = Capture::filled(32, 16, BG);
        // Reversed and partial runs only.
        for (i, c) in SEQ.iter().rev().enumerate() {
            cap.set_pixel(i as u32, 4, *c);
        }
        for (i, c) in SEQ[..3].iter().enumerate() {
            cap.set_pixel(10 + i as u32, 9, *c);
        }
        check(scan(&cap, &index).len(), 0)
    }));

    trials.push(Trial::test("first_match_wins", || {
        let index = index_of("bar", Direction::RowMajor, Point::default());
        let mut cap = Capture::filled(32, 16, BG);
        paint(&mut cap, (20, 10), Direction::RowMajor);
        paint(&mut cap, (2, 3), Direction::RowMajor);
        check(scan(&cap, &index).get("bar"), Some(Point::new(2, 3)))
    }));

    trials.push(Trial::test("column_major_needs_a_column", || {
        let column = index_of("marker", Direction::ColumnMajor, Point::default());
        let row = index_of("marker", Direction::RowMajor, Point::default());
        let mut cap = Capture::filled(16, 16, BG);
        paint(&mut cap, (9, 4), Direction::ColumnMajor);
        check(scan(&cap, &column).get("marker"), Some(Point::new(9, 4)))?;
        check(scan(&cap, &row).get("marker"), None)
    }));

    trials.push(Trial::test("dump_round_trip_then_scan", || {
        let index = index_of("bar", Direction::RowMajor, Point::default());
        let mut cap = Capture::filled(24, 8, BG);
        paint(&mut cap, (5, 6), Direction::RowMajor);

        let mut bytes = Vec::new();
        write_dump(&cap, &mut bytes).map_err(|e| e.to_string())?;
        let replayed = read_dump(&bytes).map_err(|e| e.to_string())?;
        check(scan(&replayed, &index), scan(&cap, &index))
    }));

    trials
}

fn replay_fixture(dump: &Path, manifest: &Path) -> Result<(), Failed> {
    let capture = load_dump(dump).map_err(|e| e.to_string())?;
    let text = std::fs::read_to_string(manifest).map_err(|e| e.to_string())?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;

    let set = SignatureSet::from_json(&json["signatures"]).map_err(|e| e.to_string())?;
    let expect: BTreeMap<String, Option<Point>> =
        serde_json::from_value(json["expect"].clone()).map_err(|e| e.to_string())?;

    let result = scan(&capture, &SignatureIndex::build(&set).map_err(|e| e.to_string())?);
    for (name, want) in expect {
        let got = result.get(&name);
        if got != want {
            return Err(format!("{}: got {:?}, want {:?}", name, got, want).into());
        }
    }
    Ok(())
}

fn from_dir(dir: &Path) -> Vec<Trial> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        eprintln!("cannot read {}", dir.display());
        return Vec::new();
    };
    let mut dumps: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "dump"))
        .collect();
    dumps.sort();

    dumps
        .into_iter()
        .map(|dump| {
            let name = dump.file_stem().unwrap_or_default().to_string_lossy().to_string();
            let manifest = dump.with_extension("json");
            Trial::test(format!("fixture_{}", name), move || replay_fixture(&dump, &manifest))
        })
        .collect()
}

fn main() {
    let args = Arguments::from_args();
    let mut trials = synthetic();
    if let Some(dir) = std::env::var_os("PIXWATCH_FIXTURES") {
        trials.extend(from_dir(Path::new(&dir)));
    }
    libtest_mimic::run(&args, trials).exit();
}
