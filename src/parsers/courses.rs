use crate::models::Course;
use scraper::{Html, Selector};
use uuid::Uuid;

/// The CSS class AISIS puts on every data cell of the listing table.
const COURSE_CELL_SELECTOR: &str = "td.text02";

/// Number of marked cells the listing page emits per course row.
///
/// The page tiles each course across exactly this many `text02` cells, most
/// of them unused. Together with the column offsets below this is the one
/// structural invariant of the AISIS markup; revisit both if the portal's
/// table layout ever changes.
pub const CELLS_PER_ROW: usize = 14;

// Cell offsets within one row group. Offsets not named here are unused.
const COL_CAT_NO: usize = 0;
const COL_SECTION: usize = 1;
const COL_COURSE_TITLE: usize = 2;
const COL_UNITS: usize = 3;
const COL_TIME: usize = 4;
const COL_ROOM: usize = 5;
const COL_INSTRUCTOR: usize = 6;
const COL_REMARKS: usize = 11;

/// Annotation tokens stripped from the meeting-time column.
const TIME_ANNOTATIONS: [&str; 2] = ["(FULLY ONSITE)", "(FULLY ONLINE)"];

/// Parses a listing page into course records for the given department.
///
/// Walks the flat sequence of `text02` cells in groups of [`CELLS_PER_ROW`].
/// A trailing partial group cannot represent a complete course and is
/// dropped, as are rows whose catalog number is blank (placeholder rows the
/// portal emits for some departments). A page with no matching cells is a
/// department with no offerings, not an error, and yields an empty list.
pub fn parse_courses_from_html(html: &str, dept_code: &str) -> Vec<Course> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(COURSE_CELL_SELECTOR).unwrap();

    let cells: Vec<String> = document
        .select(&selector)
        .map(|cell| cell.text().collect::<String>())
        .collect();

    let mut courses = Vec::new();

    for row in cells.chunks_exact(CELLS_PER_ROW) {
        let cat_no = normalize_ws(&row[COL_CAT_NO]);
        if cat_no.is_empty() {
            continue;
        }

        courses.push(Course {
            id: Uuid::new_v4().to_string(),
            dept_code: dept_code.to_string(),
            cat_no,
            section: normalize_ws(&row[COL_SECTION]),
            course_title: normalize_ws(&row[COL_COURSE_TITLE]),
            units: normalize_ws(&row[COL_UNITS]),
            time: clean_meeting_time(&row[COL_TIME]),
            room: room_or_tba(&row[COL_ROOM]),
            instructor: normalize_ws(&row[COL_INSTRUCTOR]),
            remarks: normalize_ws(&row[COL_REMARKS]),
        });
    }

    courses
}

/// Collapses every run of whitespace (including newlines) into a single
/// space and trims the ends. Idempotent.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes the meeting-time column and strips the modality annotations,
/// tildes and any empty trailing parenthesis group the portal tacks on.
pub fn clean_meeting_time(raw: &str) -> String {
    let mut time = normalize_ws(raw);
    for token in TIME_ANNOTATIONS {
        time = time.replace(token, "");
    }
    time = time.replace('~', "");
    time = normalize_ws(&time);
    if let Some(stripped) = time.strip_suffix("()") {
        time = stripped.trim_end().to_string();
    }
    time
}

/// The room column, reduced to the literal sentinel "TBA" whenever the raw
/// cell mentions it anywhere.
pub fn room_or_tba(raw: &str) -> String {
    if raw.contains("TBA") {
        "TBA".to_string()
    } else {
        normalize_ws(raw)
    }
}
