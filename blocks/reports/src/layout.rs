use chrono::{DateTime, Datelike, Utc};
use dentcheck_atoms::submissions::Submission;

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// Flowing content never goes below this line; the footer lives underneath.
const CONTENT_BOTTOM: f32 = 765.0;
/// Where flowed content resumes on an overflow page.
const CONTENT_TOP: f32 = 40.0;

const IMAGE_WIDTH: f32 = 240.0;
const IMAGE_TOP: f32 = 170.0;

const NOTE_WIDTH: f32 = 480.0;
const FINDINGS_X: f32 = 70.0;
const FINDINGS_WIDTH: f32 = 475.0;

pub const NOTE_PLACEHOLDER: &str = "No note was provided.";
pub const DISCLAIMER: &str = "This is a preliminary evaluation, not a final diagnosis.";
pub const REPORT_TITLE: &str = "Oral Health Evaluation Report";

const BRAND: Rgb = Rgb(0x1F, 0x4E, 0x79);
const BODY: Rgb = Rgb(0x33, 0x33, 0x33);
const NOTE: Rgb = Rgb(0x55, 0x55, 0x55);
const FOOTER_RULE: Rgb = Rgb(0xE0, 0xE0, 0xE0);
const FOOTER_TEXT: Rgb = Rgb(0x75, 0x75, 0x75);

/// General guidance printed on every report. Not derived from the
/// annotations.
pub const RECOMMENDATIONS: [(&str, &str); 4] = [
    (
        "Visible Decay / Cavities",
        "Restorative work such as fillings may be required. An in-person dental visit is highly recommended.",
    ),
    (
        "Gingival Inflammation",
        "Indicates potential gingivitis. We recommend professional scaling and a review of your oral hygiene routine.",
    ),
    (
        "Dental Stains",
        "Most external stains can be removed with professional teeth cleaning (prophylaxis).",
    ),
    (
        "Tooth Wear (Attrition)",
        "A protective restoration or a custom night guard may be necessary to prevent further damage.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Original,
    Annotated,
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
    },
    Rule {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgb,
    },
    Dot {
        center: (f32, f32),
        radius: f32,
        color: Rgb,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    /// All text runs on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = ImageSlot> + '_ {
        self.elements.iter().filter_map(|e| match e {
            Element::Image { slot, .. } => Some(*slot),
            _ => None,
        })
    }

    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, bold: bool, color: Rgb) {
        self.elements.push(Element::Text {
            text: text.into(),
            x,
            y,
            size,
            bold,
            color,
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        self.elements.push(Element::Rule { from, to, width, color });
    }
}

/// Positioned elements per page. Positions are PDF points on an A4 page
/// measured from the top-left corner; text `y` is the top of the line box.
/// The PDF renderer does the flip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub clinic_name: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            clinic_name: "OralVis Healthcare".to_string(),
        }
    }
}

/// Sizes of the images that made it into the report. `None` leaves the slot
/// out entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSlots {
    pub original: Option<ImageSize>,
    pub annotated: Option<ImageSize>,
}

/// Rough Helvetica advance width. Builtin PDF fonts carry no metrics, so
/// alignment and wrapping work from an average glyph width.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.56 } else { 0.5 };
    text.chars().count() as f32 * size * em
}

/// Greedy word wrap against `max_width`. Words longer than a line are kept
/// whole on their own line.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if !current.is_empty() && text_width(&candidate, size, false) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// `M/D/YYYY`, falling back to the stored string when it is not RFC 3339.
pub fn format_submission_date(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

/// Tracks the flow position and breaks pages when content runs out of room.
struct Flow {
    pages: Vec<Page>,
    y: f32,
}

impl Flow {
    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Make room for `height` points, starting a fresh page if needed.
    fn reserve(&mut self, height: f32) {
        if self.y + height > CONTENT_BOTTOM {
            self.pages.push(Page::default());
            self.y = CONTENT_TOP;
        }
    }
}

fn header(page: &mut Page, settings: &ReportSettings) {
    page.text(settings.clinic_name.as_str(), 40.0, 58.0, 14.0, true, BRAND);
    let title_x = 555.0 - text_width(REPORT_TITLE, 22.0, true);
    page.text(REPORT_TITLE, title_x.max(160.0), 55.0, 22.0, true, BRAND);
    page.rule((40.0, 100.0), (555.0, 100.0), 1.5, BRAND);
}

fn section_heading(flow: &mut Flow, title: &str, rule_end: f32) {
    flow.reserve(40.0);
    let y = flow.y;
    let page = flow.page();
    page.text(title, 50.0, y, 14.0, true, BRAND);
    page.rule((50.0, y + 17.0), (rule_end, y + 17.0), 1.0, BRAND);
    flow.y = y + 27.0;
}

fn patient_info(flow: &mut Flow, submission: &Submission) {
    let top = flow.y;
    let rows = [
        ("Patient Name:", submission.patient_details.name.clone()),
        ("Submission Date:", format_submission_date(&submission.created_at)),
        ("Submission ID:", submission.id_excerpt()),
    ];
    let page = flow.page();
    for (i, (label, value)) in rows.into_iter().enumerate() {
        let y = top + 20.0 * i as f32;
        page.text(label, 50.0, y, 11.0, true, BODY);
        page.text(value, 160.0, y, 11.0, false, BODY);
    }
    flow.y = top + 100.0;
}

fn patient_note(flow: &mut Flow, submission: &Submission) {
    section_heading(flow, "Patient's Note", 150.0);

    let note = submission
        .patient_details
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(NOTE_PLACEHOLDER);

    for line in wrap_text(note, 10.0, NOTE_WIDTH) {
        flow.reserve(12.5);
        let y = flow.y;
        flow.page().text(line, 50.0, y, 10.0, false, NOTE);
        flow.y += 12.5;
    }
}

fn findings(flow: &mut Flow) {
    flow.y += 36.0;
    section_heading(flow, "Preliminary Observations & Recommendations", 380.0);

    for (issue, treatment) in RECOMMENDATIONS {
        let lines = wrap_text(&format!("{}: {}", issue, treatment), 10.0, FINDINGS_WIDTH);
        let count = lines.len() as f32;
        flow.reserve(12.5 * count);

        let top = flow.y;
        let page = flow.page();
        page.elements.push(Element::Dot {
            center: (55.0, top + 6.0),
            radius: 2.5,
            color: BRAND,
        });
        for (i, line) in lines.into_iter().enumerate() {
            let y = top + 12.5 * i as f32;
            if i == 0 && line.starts_with(issue) {
                let rest = &line[issue.len()..];
                page.text(issue, FINDINGS_X, y, 10.0, true, BODY);
                page.text(rest, FINDINGS_X + text_width(issue, 10.0, true), y, 10.0, false, BODY);
            } else {
                page.text(line, FINDINGS_X, y, 10.0, false, BODY);
            }
        }
        flow.y = top + 12.5 * (count + 1.0);
    }
}

/// Fit an image into the fixed column width, shrinking further if it would
/// run into the footer.
fn fitted(size: ImageSize) -> (f32, f32) {
    let aspect = size.height.max(1) as f32 / size.width.max(1) as f32;
    let mut width = IMAGE_WIDTH;
    let mut height = width * aspect;
    let room = CONTENT_BOTTOM - IMAGE_TOP;
    if height > room {
        height = room;
        width = height / aspect;
    }
    (width, height)
}

fn images_page(settings: &ReportSettings, slots: &ImageSlots) -> Page {
    let mut page = Page::default();
    header(&mut page, settings);
    page.text("Submitted Images", 50.0, 120.0, 14.0, true, BRAND);

    let columns = [
        (ImageSlot::Original, slots.original, "Original Submission", 50.0),
        (ImageSlot::Annotated, slots.annotated, "Doctor's Annotated Review", 310.0),
    ];
    for (slot, size, label, x) in columns {
        let Some(size) = size else { continue };
        let (width, height) = fitted(size);
        page.text(label, x, 150.0, 11.0, true, BRAND);
        page.elements.push(Element::Image {
            slot,
            x,
            y: IMAGE_TOP,
            width,
            height,
        });
    }
    page
}

/// Stamp the footer on every page, once all content has been placed.
fn footer(pages: &mut [Page], settings: &ReportSettings, year: i32) {
    let line = format!("{} (c) {} | {}", settings.clinic_name, year, DISCLAIMER);
    let x = 50.0 + ((500.0 - text_width(&line, 8.0, false)) / 2.0).max(0.0);
    for page in pages {
        page.rule((50.0, 780.0), (550.0, 780.0), 0.5, FOOTER_RULE);
        page.text(line.as_str(), x, 790.0, 8.0, false, FOOTER_TEXT);
    }
}

/// Lay out the full report.
///
/// Page one carries the header, patient details, the note and the fixed
/// recommendations, and may overflow onto further pages for long notes.
/// The images page always follows.
pub fn compose_layout(
    submission: &Submission,
    slots: &ImageSlots,
    settings: &ReportSettings,
    generated_at: DateTime<Utc>,
) -> ReportLayout {
    let mut first = Page::default();
    header(&mut first, settings);

    let mut flow = Flow {
        pages: vec![first],
        y: 130.0,
    };
    patient_info(&mut flow, submission);
    patient_note(&mut flow, submission);
    findings(&mut flow);

    let mut pages = flow.pages;
    pages.push(images_page(settings, slots));
    footer(&mut pages, settings, generated_at.year());

    ReportLayout { pages }
}
