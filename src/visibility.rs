// src/visibility.rs

use crate::{
    error::{AppError, AppResult},
    models::{Course, Lesson, Module, ResourceStatus},
};

/// Subset of `course` the viewer may see. Admins get the tree unchanged; everyone else
/// only sees published lessons, and only modules that keep at least one of them.
pub fn filter_course_for_viewer(course: &Course, viewer_is_admin: bool) -> Course {
    if viewer_is_admin {
        return course.clone();
    }
    let modules = course
        .modules
        .iter()
        .filter_map(|module| {
            let lessons: Vec<Lesson> = module
                .lessons
                .iter()
                .filter(|lesson| lesson.status == ResourceStatus::Published)
                .cloned()
                .collect();
            (!lessons.is_empty()).then(|| Module {
                lessons,
                ..module.clone()
            })
        })
        .collect();
    Course {
        product_id: course.product_id.clone(),
        modules,
    }
}

/// What the player opens on first render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSelection<'a> {
    Ready {
        module: &'a Module,
        lesson: &'a Lesson,
    },
    /// Nothing to play yet; rendered as "content pending", never as a failure.
    ContentPending,
}

pub fn default_selection(filtered: &Course) -> PlayerSelection<'_> {
    filtered
        .modules
        .first()
        .and_then(|module| module.lessons.first().map(|lesson| (module, lesson)))
        .map_or(PlayerSelection::ContentPending, |(module, lesson)| {
            PlayerSelection::Ready { module, lesson }
        })
}

/// Finds a lesson by id in an already filtered tree.
pub fn find_lesson<'a>(filtered: &'a Course, lesson_id: &str) -> Option<(&'a Module, &'a Lesson)> {
    filtered.modules.iter().find_map(|module| {
        module
            .lessons
            .iter()
            .find(|lesson| lesson.id == lesson_id)
            .map(|lesson| (module, lesson))
    })
}

/// Filtered course for an offering, or `ContentUnavailable` when nothing is visible.
pub fn visible_course(
    course: Option<&Course>,
    product_id: &str,
    viewer_is_admin: bool,
) -> AppResult<Course> {
    let filtered = course
        .map(|c| filter_course_for_viewer(c, viewer_is_admin))
        .unwrap_or_else(|| Course::empty(product_id));
    match default_selection(&filtered) {
        PlayerSelection::Ready { .. } => Ok(filtered),
        PlayerSelection::ContentPending => Err(AppError::ContentUnavailable(format!(
            "aucune leçon disponible pour '{}'",
            product_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoProvider;

    fn lesson(id: &str, status: ResourceStatus) -> Lesson {
        Lesson {
            id: id.into(),
            title: id.to_uppercase(),
            duration: "01:00".into(),
            video_url: "https://cdn.test/v.mp4".into(),
            provider: VideoProvider::Native,
            status,
            description: None,
            checklist: None,
        }
    }

    fn module(id: &str, status: ResourceStatus, lessons: Vec<Lesson>) -> Module {
        Module {
            id: id.into(),
            title: id.into(),
            status,
            lessons,
        }
    }

    fn mixed_course() -> Course {
        use ResourceStatus::*;
        Course {
            product_id: "p1".into(),
            modules: vec![
                module("m1", Published, vec![lesson("a", Draft), lesson("b", Draft)]),
                module("m2", Draft, vec![lesson("c", Published)]),
            ],
        }
    }

    #[test]
    fn non_admin_sees_only_modules_with_published_lessons() {
        let filtered = filter_course_for_viewer(&mixed_course(), false);
        assert_eq!(filtered.modules.len(), 1);
        assert_eq!(filtered.modules[0].id, "m2");
        assert_eq!(filtered.modules[0].lessons.len(), 1);
        assert_eq!(filtered.modules[0].lessons[0].id, "c");
    }

    #[test]
    fn admin_sees_the_tree_unchanged() {
        let course = mixed_course();
        assert_eq!(filter_course_for_viewer(&course, true), course);
    }

    #[test]
    fn filtering_is_pure() {
        let course = mixed_course();
        assert_eq!(
            filter_course_for_viewer(&course, false),
            filter_course_for_viewer(&course, false)
        );
    }

    #[test]
    fn default_selection_picks_first_module_and_lesson() {
        let filtered = filter_course_for_viewer(&mixed_course(), false);
        match default_selection(&filtered) {
            PlayerSelection::Ready { module, lesson } => {
                assert_eq!(module.id, "m2");
                assert_eq!(lesson.id, "c");
            }
            PlayerSelection::ContentPending => panic!("expected a selection"),
        }
    }

    #[test]
    fn empty_result_is_content_pending_not_a_fault() {
        let course = Course {
            product_id: "p3".into(),
            modules: vec![module("m1", ResourceStatus::Published, vec![lesson("a", ResourceStatus::Draft)])],
        };
        let filtered = filter_course_for_viewer(&course, false);
        assert_eq!(default_selection(&filtered), PlayerSelection::ContentPending);

        let err = visible_course(Some(&course), "p3", false).unwrap_err();
        assert_eq!(err.notice_kind(), crate::error::NoticeKind::Pending);
        assert!(visible_course(None, "p5", true).is_err());
        assert!(visible_course(Some(&course), "p3", true).is_ok());
    }

    #[test]
    fn seeded_course_hides_the_draft_lesson() {
        let courses = crate::catalog::seed_courses();
        let course = &courses["p1_door_slammed"];
        let filtered = filter_course_for_viewer(course, false);
        assert_eq!(filtered.lesson_count(), 6);
        assert!(find_lesson(&filtered, "l5_double").is_none());
        assert!(find_lesson(&filtered, "l4_gesture").is_some());
    }
}
