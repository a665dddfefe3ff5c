// Seeded throwaway catalogs shared by the unit and socket tests.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::NamedTempFile;

use super::Catalog;

/// The catalog schema, as found in the production reg database.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE classes (classid INTEGER, courseid INTEGER, days TEXT, \
     starttime TEXT, endtime TEXT, bldg TEXT, roomnum TEXT)",
    "CREATE TABLE courses (courseid INTEGER, area TEXT, title TEXT, descrip TEXT, prereqs TEXT)",
    "CREATE TABLE crosslistings (courseid INTEGER, dept TEXT, coursenum TEXT)",
    "CREATE TABLE profs (profid INTEGER, profname TEXT)",
    "CREATE TABLE coursesprofs (courseid INTEGER, profid INTEGER)",
];

/// A small catalog covering every display path: multiple sections of one
/// course, a course cross-listed twice, one with no cross-listings, one
/// with no professors, and titles carrying literal wildcard characters.
pub const SAMPLE_ROWS: &[&str] = &[
    "INSERT INTO courses VALUES (3142, 'qr', 'Advanced Programming Techniques', \
     'The practice of programming in the large.', 'COS 217 or COS 226')",
    "INSERT INTO courses VALUES (3207, 'sa', 'Cultural Anthropology', \
     'Survey of ethnographic method.', 'None')",
    "INSERT INTO courses VALUES (4100, 'la', 'Independent Study', \
     'Reading course with rotating topics.', 'Instructor permission')",
    "INSERT INTO courses VALUES (5001, 'st', 'C_S Lab Methods', 'Lab practicum.', 'None')",
    "INSERT INTO courses VALUES (5002, 'st', 'CMS Lab Methods', 'Media lab practicum.', 'None')",
    "INSERT INTO crosslistings VALUES (3142, 'COS', '333')",
    "INSERT INTO crosslistings VALUES (3207, 'ANT', '201')",
    "INSERT INTO crosslistings VALUES (3207, 'HUM', '201')",
    "INSERT INTO crosslistings VALUES (5001, 'MAT', '210')",
    "INSERT INTO crosslistings VALUES (5002, 'MAT', '215')",
    "INSERT INTO classes VALUES (8321, 3142, 'TTh', '11:00 AM', '12:20 PM', 'FRIEN', '101')",
    "INSERT INTO classes VALUES (8322, 3142, 'MW', '01:30 PM', '02:50 PM', 'CSB', '105')",
    "INSERT INTO classes VALUES (9032, 3207, 'MWF', '10:00 AM', '10:50 AM', 'GREEN', '130')",
    "INSERT INTO classes VALUES (9555, 4100, 'F', '03:00 PM', '04:20 PM', 'EQUAD', 'B205')",
    "INSERT INTO classes VALUES (7001, 5001, 'T', '09:00 AM', '10:50 AM', 'FINE', '214')",
    "INSERT INTO classes VALUES (7002, 5002, 'W', '09:00 AM', '10:50 AM', 'FINE', '216')",
    "INSERT INTO profs VALUES (1, 'Robert Dondero')",
    "INSERT INTO profs VALUES (2, 'Christopher Moretti')",
    "INSERT INTO profs VALUES (3, 'Maria Alvarez')",
    "INSERT INTO coursesprofs VALUES (3142, 1)",
    "INSERT INTO coursesprofs VALUES (3142, 2)",
    "INSERT INTO coursesprofs VALUES (4100, 3)",
    "INSERT INTO coursesprofs VALUES (5001, 3)",
];

/// Two searchable rows where the second title is a raw BLOB; reading it
/// as text fails after the first row has already streamed. A NULL title
/// would decode as an empty string instead of faulting.
pub const BLOB_TITLE_ROWS: &[&str] = &[
    "INSERT INTO courses VALUES (1, 'qr', 'Archery', 'Range practice.', 'None')",
    "INSERT INTO crosslistings VALUES (1, 'AAA', '100')",
    "INSERT INTO classes VALUES (100, 1, 'M', '09:00 AM', '09:50 AM', 'GYM', '1')",
    "INSERT INTO courses VALUES (2, 'qr', X'FFFE', 'Broken row.', 'None')",
    "INSERT INTO crosslistings VALUES (2, 'ZZZ', '900')",
    "INSERT INTO classes VALUES (900, 2, 'T', '09:00 AM', '09:50 AM', 'GYM', '2')",
];

/// classid 500 points at courseid 77, which has no courses row.
pub const DANGLING_COURSE_ROWS: &[&str] = &[
    "INSERT INTO classes VALUES (500, 77, 'M', '09:00 AM', '09:50 AM', 'HALL', '7')",
    "INSERT INTO crosslistings VALUES (77, 'COS', '100')",
];

pub fn schema_with(rows: &[&'static str]) -> Vec<&'static str> {
    SCHEMA.iter().chain(rows).copied().collect()
}

pub fn sample_statements() -> Vec<&'static str> {
    schema_with(SAMPLE_ROWS)
}

/// Creates a database file and runs `statements` against it through a
/// short-lived writable pool. The file is valid for read-only opens once
/// this returns.
pub async fn seed_database(statements: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp catalog file");
    let options = SqliteConnectOptions::new().filename(file.path());
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("open catalog for seeding");
    for statement in statements {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("seed catalog");
    }
    pool.close().await;
    file
}

pub async fn catalog_from(statements: &[&str]) -> (NamedTempFile, Catalog) {
    let file = seed_database(statements).await;
    let catalog = Catalog::open(file.path(), 4)
        .await
        .expect("open seeded catalog");
    (file, catalog)
}

pub async fn sample_database() -> NamedTempFile {
    seed_database(&sample_statements()).await
}

pub async fn sample_catalog() -> (NamedTempFile, Catalog) {
    catalog_from(&sample_statements()).await
}
