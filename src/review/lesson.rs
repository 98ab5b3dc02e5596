// src/review/lesson.rs

use std::collections::HashMap;

use crate::models::submission::LessonItemOutcome;

/// Evaluation items every lesson review is judged on.
const BASE_ITEMS: [&str; 5] = ["声・表情", "規律", "礼儀", "板書", "時間配分"];

/// Fixed checklist for a lesson review, derived from the exam title.
/// One-on-one formats additionally judge how the reviewer handles the
/// student directly.
pub fn checklist_for(exam_title: &str) -> Vec<&'static str> {
    let mut items: Vec<&'static str> = BASE_ITEMS.to_vec();
    if exam_title.contains("個別") {
        items.push("生徒対応");
    }
    items
}

/// Full item map for a lesson review: every checklist item appears, marks
/// not provided by the reviewer default to `NotSelected`.
pub fn resolve_item_marks(
    exam_title: &str,
    marks: Option<&HashMap<String, LessonItemOutcome>>,
) -> HashMap<String, LessonItemOutcome> {
    checklist_for(exam_title)
        .into_iter()
        .map(|item| {
            let mark = marks
                .and_then(|m| m.get(item))
                .copied()
                .unwrap_or(LessonItemOutcome::NotSelected);
            (item.to_string(), mark)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checklist_derives_from_exam_title() {
        assert_eq!(checklist_for("昇格試験").len(), 5);
        assert!(checklist_for("個別指導 昇格試験").contains(&"生徒対応"));
    }

    #[test]
    fn unmarked_items_default_to_not_selected() {
        let marks = HashMap::from([("規律".to_string(), LessonItemOutcome::Passed)]);
        let resolved = resolve_item_marks("昇格試験", Some(&marks));

        assert_eq!(resolved.len(), 5);
        assert_eq!(resolved["規律"], LessonItemOutcome::Passed);
        assert_eq!(resolved["礼儀"], LessonItemOutcome::NotSelected);
    }
}
