// src/utils/csv.rs
//
// CSV export of the admin submission list. UTF-8 with a byte-order mark for
// spreadsheet compatibility; values containing a comma, quote or newline are
// quoted with embedded quotes doubled.

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::exam::Exam;
use crate::models::submission::Submission;

const EMPTY: &str = "－";

const HEADERS: [&str; 14] = [
    "試験名",
    "受験者名",
    "社員番号",
    "受験者本部",
    "提出日時",
    "ステータス",
    "本部スコア",
    "人事室スコア",
    "最終スコア",
    "授業審査URL",
    "第一希望日時",
    "第二希望日時",
    "学校名",
    "教室名",
];

/// Quotes a field when needed, doubling embedded quotes.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Wraps an employee-id-like value so spreadsheets keep it as text instead
/// of stripping leading zeros.
fn force_text(field: &str) -> String {
    format!("=\"{}\"", field)
}

/// Exam-local timezone for rendered timestamps.
fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("JST offset is valid")
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&jst()).format("%Y/%m/%d %H:%M").to_string()
}

fn opt_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| EMPTY.to_string())
}

fn opt_score(score: Option<i64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| EMPTY.to_string())
}

fn opt_text(text: Option<&str>) -> String {
    text.filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| EMPTY.to_string())
}

/// Renders the whole submission list as a CSV document, BOM included.
pub fn submissions_csv(exams: &[Exam], submissions: &[Submission]) -> String {
    let mut lines = Vec::with_capacity(submissions.len() + 1);
    lines.push(HEADERS.join(","));

    for submission in submissions {
        let exam_title = exams
            .iter()
            .find(|e| e.id == submission.exam_id)
            .map(|e| e.title.as_str())
            .unwrap_or(EMPTY);

        let fields = [
            exam_title.to_string(),
            submission.examinee_name.clone(),
            force_text(&submission.examinee_id),
            opt_text(submission.examinee_headquarters.as_deref()),
            format_timestamp(&submission.submitted_at),
            submission.status.display_name().to_string(),
            opt_score(submission.hq_grade.as_ref().map(|g| g.score)),
            opt_score(submission.po_grade.as_ref().map(|g| g.score)),
            opt_score(submission.final_score),
            opt_text(submission.lesson_review_url.as_deref()),
            opt_timestamp(submission.lesson_review_date1.as_ref()),
            opt_timestamp(submission.lesson_review_date2.as_ref()),
            opt_text(submission.lesson_review_school_name.as_deref()),
            opt_text(submission.lesson_review_classroom_name.as_deref()),
        ];

        let row: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        lines.push(row.join(","));
    }

    format!("\u{feff}{}", lines.join("\n"))
}
