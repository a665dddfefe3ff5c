use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::Catalog;

/// The four optional search fields, in the order the wire delivers them.
/// Empty fields leave that column unrestricted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    pub dept: String,
    pub num: String,
    pub area: String,
    pub title: String,
}

/// One row of the class search, joined across classes, courses and
/// crosslistings. A course listed under several departments yields one
/// row per listing; a course with no listing never appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub class_id: i64,
    pub dept: String,
    pub course_num: String,
    pub area: String,
    pub title: String,
}

const SEARCH_BASE: &str = "SELECT classid, dept, coursenum, area, title \
    FROM classes, courses, crosslistings \
    WHERE classes.courseid = courses.courseid \
    AND courses.courseid = crosslistings.courseid";

const SEARCH_ORDER: &str = " ORDER BY dept ASC, coursenum ASC, classid ASC";

/// Prefixes `%` and `_` with `\` so they match only themselves.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || c == '_' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the catalog search for the given filters. Each non-empty field
/// contributes one AND-ed LIKE clause, in the order area, dept, coursenum,
/// title. The pattern is always a bound parameter, never spliced into the
/// template, so no field content can change the query shape.
pub fn build_search_query(filters: &SearchFilters) -> (String, Vec<String>) {
    let columns = [
        ("area", &filters.area),
        ("dept", &filters.dept),
        ("coursenum", &filters.num),
        ("title", &filters.title),
    ];

    let mut sql = String::from(SEARCH_BASE);
    let mut params = Vec::new();
    for (column, value) in columns {
        if value.is_empty() {
            continue;
        }
        sql.push_str(" AND ");
        sql.push_str(column);
        sql.push_str(" LIKE ? ESCAPE '\\'");
        params.push(format!("%{}%", escape_like(value)));
    }
    sql.push_str(SEARCH_ORDER);
    (sql, params)
}

/// Fixed-width catalog row: class id right-justified in 5, dept in 3,
/// course number in 4, area in 3, title left-justified in 40, single
/// spaces between. Values wider than their column are kept whole.
pub fn format_row(row: &SearchRow) -> String {
    format!(
        "{:>5} {:>3} {:>4} {:>3} {:<40}",
        row.class_id, row.dept, row.course_num, row.area, row.title
    )
}

impl SearchRow {
    fn decode(row: &SqliteRow) -> Result<SearchRow, sqlx::Error> {
        Ok(SearchRow {
            class_id: row.try_get("classid")?,
            dept: row.try_get("dept")?,
            course_num: row.try_get("coursenum")?,
            area: row.try_get("area")?,
            title: row.try_get("title")?,
        })
    }
}

impl Catalog {
    /// Streams search rows one at a time so the caller can start writing
    /// before the result set is complete.
    pub fn search<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> BoxStream<'a, Result<SearchRow, sqlx::Error>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }
        query
            .fetch(&self.pool)
            .map(|row| row.and_then(|row| SearchRow::decode(&row)))
            .boxed()
    }
}
