//! Display metadata for subjects: one lookup table with a fallback entry.

/// Icon and colors used wherever a subject is rendered
#[derive(Debug, PartialEq, Eq)]
pub struct SubjectStyle {
    pub icon: &'static str,
    /// Accent color (borders, dark-mode fill)
    pub color: &'static str,
    /// Light background fill
    pub background: &'static str,
}

const SUBJECT_STYLES: &[(&str, SubjectStyle)] = &[
    (
        "Xác suất thống kê",
        SubjectStyle {
            icon: "📊",
            color: "#1890ff",
            background: "#e6f7ff",
        },
    ),
    (
        "Lý sinh",
        SubjectStyle {
            icon: "⚛️",
            color: "#faad14",
            background: "#fffbe6",
        },
    ),
    (
        "Sinh học và Di truyền",
        SubjectStyle {
            icon: "🧬",
            color: "#13c2c2",
            background: "#e6fffb",
        },
    ),
    (
        "Văn",
        SubjectStyle {
            icon: "📝",
            color: "#722ed1",
            background: "#f9f0ff",
        },
    ),
    (
        "Hóa học",
        SubjectStyle {
            icon: "🧪",
            color: "#eb2f96",
            background: "#fff0f6",
        },
    ),
    (
        "Triết học Mác – Lênin",
        SubjectStyle {
            icon: "📚",
            color: "#fa8c16",
            background: "#fff7e6",
        },
    ),
    (
        "Tổng quan ngành Y tế - Pháp luật Y tế",
        SubjectStyle {
            icon: "⚕️",
            color: "#2f54eb",
            background: "#f0f5ff",
        },
    ),
    (
        "Bóng đá 1",
        SubjectStyle {
            icon: "⚽",
            color: "#52c41a",
            background: "#f6ffed",
        },
    ),
];

/// Used for any subject missing from the table
pub static FALLBACK_STYLE: SubjectStyle = SubjectStyle {
    icon: "📖",
    color: "#666666",
    background: "#fafafa",
};

pub fn style_for(subject: &str) -> &'static SubjectStyle {
    SUBJECT_STYLES
        .iter()
        .find(|(name, _)| *name == subject)
        .map(|(_, style)| style)
        .unwrap_or(&FALLBACK_STYLE)
}

/// All subjects with a dedicated style, for the calendar legend
pub fn known_styles() -> impl Iterator<Item = (&'static str, &'static SubjectStyle)> {
    SUBJECT_STYLES.iter().map(|(name, style)| (*name, style))
}
