use serde::{Deserialize, Serialize};

use crate::shapes::{AnnotationSet, SurfaceSize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Processed,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processed => "processed",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(SubmissionStatus::Pending),
            "processed" => Some(SubmissionStatus::Processed),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }
}

/// Patient identity captured when the photo was uploaded. Not kept in sync
/// with the user record afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatientDetails {
    pub name: String,
    pub patient_id: String,
    pub email: String,
    pub note: Option<String>,
}

fn empty_annotations() -> String {
    "[]".to_string()
}

/// One patient's screening request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Submission {
    pub submission_id: String,
    pub patient_id: String,
    pub patient_details: PatientDetails,
    pub original_image_url: String,
    pub annotated_image_url: Option<String>,
    #[serde(default = "empty_annotations")]
    pub annotations: String,
    /// Display surface the annotations were drawn on.
    pub annotation_surface: Option<SurfaceSize>,
    pub status: SubmissionStatus,
    pub report_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Submission {
    pub fn annotation_set(&self) -> AnnotationSet {
        AnnotationSet::decode(&self.annotations)
    }

    /// Last 8 characters of the id, for humans telling reports apart.
    pub fn id_excerpt(&self) -> String {
        let count = self.submission_id.chars().count();
        self.submission_id.chars().skip(count.saturating_sub(8)).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionPayload {
    pub note: Option<String>,
    /// Base64 encoded photo.
    pub image: Option<String>,
    pub file_name: Option<String>,
}

/// The only mutations the portal makes to a stored submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionUpdate {
    Annotated {
        annotations: String,
        annotation_surface: Option<SurfaceSize>,
        annotated_image_url: Option<String>,
    },
    Reported {
        report_url: String,
    },
    Rejected,
}

impl SubmissionUpdate {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            SubmissionUpdate::Annotated { .. } | SubmissionUpdate::Reported { .. } => {
                SubmissionStatus::Processed
            }
            SubmissionUpdate::Rejected => SubmissionStatus::Rejected,
        }
    }

    pub fn apply(&self, submission: &mut Submission, now: &str) {
        match self {
            SubmissionUpdate::Annotated {
                annotations,
                annotation_surface,
                annotated_image_url,
            } => {
                submission.annotations = annotations.clone();
                submission.annotation_surface = *annotation_surface;
                submission.annotated_image_url = annotated_image_url.clone();
            }
            SubmissionUpdate::Reported { report_url } => {
                submission.report_url = Some(report_url.clone());
            }
            SubmissionUpdate::Rejected => {}
        }
        submission.status = self.status();
        submission.updated_at = now.to_string();
    }
}
