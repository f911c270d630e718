use chrono::{DateTime, Datelike, Utc};

use crate::models::{BookRecord, ReadingStatus};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub to_read: usize,
    pub in_progress: usize,
    pub finished: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCount {
    pub label: String,
    pub finished: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub title: String,
    pub date: DateTime<Utc>,
}

/// Aggregates for the stats screen, derived purely from the record set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingStats {
    pub status_counts: StatusCounts,
    pub total_books: usize,
    pub pages_read: i64,
    /// Mean progress across records with a known page count, in percent.
    pub average_progress: f64,
    /// Books finished per month over the trailing six months, oldest first.
    pub monthly_finished: Vec<MonthlyCount>,
    /// Genres by record count, descending; ties break alphabetically.
    pub genre_distribution: Vec<GenreCount>,
    /// Latest additions, newest first.
    pub recent_activity: Vec<ActivityEntry>,
}

impl ReadingStats {
    pub fn from_records(records: &[BookRecord], now: DateTime<Utc>) -> Self {
        let mut counts = StatusCounts::default();
        let mut pages_read = 0i64;
        let mut progress_sum = 0.0;
        let mut progress_n = 0usize;

        for record in records {
            match record.status {
                ReadingStatus::ToRead => counts.to_read += 1,
                ReadingStatus::InProgress => counts.in_progress += 1,
                ReadingStatus::Finished => counts.finished += 1,
            }
            pages_read += record.current_page.max(0);
            if record.total_pages > 0 {
                progress_sum += record.progress_fraction() * 100.0;
                progress_n += 1;
            }
        }

        let average_progress = if progress_n > 0 {
            progress_sum / progress_n as f64
        } else {
            0.0
        };

        Self {
            status_counts: counts,
            total_books: records.len(),
            pages_read,
            average_progress,
            monthly_finished: monthly_finished(records, now),
            genre_distribution: genre_distribution(records),
            recent_activity: recent_activity(records, 3),
        }
    }
}

/// (year, month) pairs for the trailing `span` months ending at `now`,
/// oldest first.
fn trailing_months(now: DateTime<Utc>, span: u32) -> Vec<(i32, u32)> {
    let mut year = now.year();
    let mut month = now.month(); // 1-based
    let mut months = Vec::with_capacity(span as usize);
    for _ in 0..span {
        months.push((year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

fn monthly_finished(records: &[BookRecord], now: DateTime<Utc>) -> Vec<MonthlyCount> {
    trailing_months(now, 6)
        .into_iter()
        .map(|(year, month)| {
            let finished = records
                .iter()
                .filter(|r| r.status == ReadingStatus::Finished)
                .filter(|r| r.date_added.year() == year && r.date_added.month() == month)
                .count();
            MonthlyCount {
                label: MONTH_LABELS[(month - 1) as usize].to_string(),
                finished,
            }
        })
        .collect()
}

fn genre_distribution(records: &[BookRecord]) -> Vec<GenreCount> {
    let mut counts: Vec<GenreCount> = Vec::new();
    for record in records {
        let name = if record.genre.is_empty() {
            "Other"
        } else {
            record.genre.as_str()
        };
        match counts.iter_mut().find(|g| g.name == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(GenreCount {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    counts
}

fn recent_activity(records: &[BookRecord], limit: usize) -> Vec<ActivityEntry> {
    let mut by_date: Vec<&BookRecord> = records.iter().collect();
    by_date.sort_by(|a, b| b.date_added.cmp(&a.date_added));
    by_date
        .into_iter()
        .take(limit)
        .map(|record| ActivityEntry {
            title: match record.status {
                ReadingStatus::ToRead => format!("Added \"{}\" to library", record.title),
                ReadingStatus::InProgress => format!("Started reading \"{}\"", record.title),
                ReadingStatus::Finished => format!("Finished \"{}\"", record.title),
            },
            date: record.date_added,
        })
        .collect()
}
