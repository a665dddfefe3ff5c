use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::Catalog;
use crate::error::Fault;
use crate::protocol;

/// One scheduled section as stored in `classes`, minus the identifier it
/// was looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRow {
    pub course_id: i64,
    pub days: String,
    pub start_time: String,
    pub end_time: String,
    pub building: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossListing {
    pub dept: String,
    pub course_num: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub area: String,
    pub title: String,
    pub description: String,
    pub prerequisites: String,
}

impl ClassRow {
    fn decode(row: &SqliteRow) -> Result<ClassRow, sqlx::Error> {
        Ok(ClassRow {
            course_id: row.try_get("courseid")?,
            days: row.try_get("days")?,
            start_time: row.try_get("starttime")?,
            end_time: row.try_get("endtime")?,
            building: row.try_get("bldg")?,
            room: row.try_get("roomnum")?,
        })
    }
}

impl CrossListing {
    fn decode(row: &SqliteRow) -> Result<CrossListing, sqlx::Error> {
        Ok(CrossListing {
            dept: row.try_get("dept")?,
            course_num: row.try_get("coursenum")?,
        })
    }
}

impl CourseInfo {
    fn decode(row: &SqliteRow) -> Result<CourseInfo, sqlx::Error> {
        Ok(CourseInfo {
            area: row.try_get("area")?,
            title: row.try_get("title")?,
            description: row.try_get("descrip")?,
            prerequisites: row.try_get("prereqs")?,
        })
    }
}

impl Catalog {
    /// Fetches one class by identifier. The id arrives as request text and
    /// is bound as-is; a non-numeric id matches no row.
    pub async fn class_by_id(&self, class_id: &str) -> Result<Option<ClassRow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT courseid, days, starttime, endtime, bldg, roomnum \
             FROM classes WHERE classid = ?",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(ClassRow::decode).transpose()
    }

    pub async fn cross_listings(&self, course_id: i64) -> Result<Vec<CrossListing>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT dept, coursenum FROM crosslistings \
             WHERE courseid = ? ORDER BY dept ASC, coursenum ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(CrossListing::decode).collect()
    }

    /// Every class row references an existing course; a missing row here
    /// is a store fault, not a not-found.
    pub async fn course_info(&self, course_id: i64) -> Result<CourseInfo, sqlx::Error> {
        let row =
            sqlx::query("SELECT area, title, descrip, prereqs FROM courses WHERE courseid = ?")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        CourseInfo::decode(&row)
    }

    pub async fn professors(&self, course_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT profname FROM profs, coursesprofs \
             WHERE coursesprofs.courseid = ? AND coursesprofs.profid = profs.profid \
             ORDER BY profname ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|row| row.try_get("profname")).collect()
    }
}

/// Where the assembler is in the lookup sequence. Each state runs exactly
/// one query; a fault in any state jumps straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailStep {
    Class,
    CrossListings { course_id: i64 },
    CourseInfo { course_id: i64 },
    Professors { course_id: i64 },
    Done,
}

/// Reconstructs one class's full detail record as a sequence of line
/// blocks, one dependent query per step.
pub struct DetailAssembler<'a> {
    catalog: &'a Catalog,
    class_id: String,
    step: DetailStep,
}

impl<'a> DetailAssembler<'a> {
    pub fn new(catalog: &'a Catalog, class_id: String) -> DetailAssembler<'a> {
        DetailAssembler {
            catalog,
            class_id,
            step: DetailStep::Class,
        }
    }

    /// Runs the next lookup and returns its block of response lines, or
    /// `None` once the record is complete. Blocks already handed out are
    /// never retracted; after any fault the machine stays in `Done`.
    pub async fn next_block(&mut self) -> Result<Option<Vec<String>>, Fault> {
        match self.step {
            DetailStep::Class => {
                let class = match self.catalog.class_by_id(&self.class_id).await {
                    Ok(Some(class)) => class,
                    Ok(None) => {
                        self.step = DetailStep::Done;
                        return Err(Fault::NoSuchClass(self.class_id.clone()));
                    }
                    Err(e) => {
                        self.step = DetailStep::Done;
                        return Err(Fault::Store(e));
                    }
                };
                self.step = DetailStep::CrossListings {
                    course_id: class.course_id,
                };
                Ok(Some(class_block(&class)))
            }
            DetailStep::CrossListings { course_id } => {
                match self.catalog.cross_listings(course_id).await {
                    Ok(listings) => {
                        self.step = DetailStep::CourseInfo { course_id };
                        Ok(Some(cross_listing_block(&listings)))
                    }
                    Err(e) => {
                        self.step = DetailStep::Done;
                        Err(Fault::Store(e))
                    }
                }
            }
            DetailStep::CourseInfo { course_id } => {
                match self.catalog.course_info(course_id).await {
                    Ok(info) => {
                        self.step = DetailStep::Professors { course_id };
                        Ok(Some(course_info_block(&info)))
                    }
                    Err(e) => {
                        self.step = DetailStep::Done;
                        Err(Fault::Store(e))
                    }
                }
            }
            DetailStep::Professors { course_id } => {
                match self.catalog.professors(course_id).await {
                    Ok(names) => {
                        self.step = DetailStep::Done;
                        Ok(Some(professor_block(&names)))
                    }
                    Err(e) => {
                        self.step = DetailStep::Done;
                        Err(Fault::Store(e))
                    }
                }
            }
            DetailStep::Done => Ok(None),
        }
    }
}

fn class_block(class: &ClassRow) -> Vec<String> {
    vec![
        protocol::CLASSID_EXISTS.to_owned(),
        format!("Course Id: {}", class.course_id),
        String::new(),
        format!("Days: {}", class.days),
        format!("Start time: {}", class.start_time),
        format!("End time: {}", class.end_time),
        format!("Building: {}", class.building),
        format!("Room: {}", class.room),
        String::new(),
    ]
}

fn cross_listing_block(listings: &[CrossListing]) -> Vec<String> {
    let mut lines: Vec<String> = listings
        .iter()
        .map(|listing| format!("Dept and Number: {} {}", listing.dept, listing.course_num))
        .collect();
    // the section break goes out even when the course has no listings
    lines.push(String::new());
    lines
}

fn course_info_block(info: &CourseInfo) -> Vec<String> {
    vec![
        format!("Area: {}", info.area),
        String::new(),
        format!("Title: {}", info.title),
        String::new(),
        format!("Description: {}", info.description),
        String::new(),
        format!("Prerequisites: {}", info.prerequisites),
        String::new(),
    ]
}

fn professor_block(names: &[String]) -> Vec<String> {
    names.iter().map(|name| format!("Professor: {name}")).collect()
}
