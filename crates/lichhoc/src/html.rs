use anyhow::Result;
use chrono::{Datelike, Months, NaiveDate, Weekday};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::engine;
use crate::settings::{ThemeSettings, PRESET_COLORS};
use crate::subjects;
use crate::types::{FilterCriteria, Session, TimeRange};
use crate::week::{self, WeekStart};

/// Maximum distinct subject icons drawn in one calendar cell
const MAX_CELL_ICONS: usize = 4;

const TITLE: &str = "Lịch Khóa Biểu";

/// Inputs for one page render
pub struct PageView<'a> {
    /// The full loaded collection
    pub all: &'a [Session],
    pub criteria: &'a FilterCriteria,
    pub today: NaiveDate,
    /// Day whose sessions are listed under the calendar; its month is displayed
    pub selected: NaiveDate,
    pub week_start: WeekStart,
    pub theme: &'a ThemeSettings,
}

/// Generate a static HTML file
pub fn generate_html(view: &PageView, path: &Path) -> Result<()> {
    let html = render_page(view);
    fs::write(path, html.into_string())?;
    Ok(())
}

pub fn render_page(view: &PageView) -> Markup {
    let visible = engine::apply_criteria(view.all, view.criteria, view.today, view.week_start);
    let subject_names = engine::unique_subjects(view.all);
    let stats = engine::statistics(view.all, &visible, view.today, view.week_start);
    let by_day = engine::group_by_day(&visible);
    let selected_sessions = engine::sessions_by_day(&visible, view.selected);
    let today_sessions = engine::todays_sessions(&visible, view.today);
    let upcoming = engine::upcoming_sessions(&visible, view.today);

    let content = html! {
        div.container {
            (render_filters(view.criteria, &subject_names, visible.len()))
            div.stats {
                (stat_card("Môn học", stats.unique_subjects, "📘"))
                (stat_card("Tổng buổi học", stats.total_sessions, "🗓️"))
                (stat_card("Hôm nay", stats.today_sessions, "🔥"))
                (stat_card("Tuần này", stats.this_week_sessions, "⏰"))
            }
            div.layout {
                main.main-column {
                    (render_calendar(view, &by_day))
                    section.card.selected-day {
                        h2 { "Ngày " (view.selected.format("%d/%m/%Y")) }
                        (render_session_list(&selected_sessions, view.today, false, "Không có buổi học nào trong ngày này."))
                    }
                    (render_legend())
                }
                aside.side-column {
                    section.card #"today" {
                        h2 { "🔥 Hôm nay (" (view.today.format("%d/%m/%Y")) ")" }
                        (render_session_list(&today_sessions, view.today, false, "Hôm nay không có buổi học nào. Nghỉ ngơi nhé!"))
                    }
                    section.card #"upcoming" {
                        h2 { "⏰ Sắp tới" }
                        (render_session_list(&upcoming, view.today, true, "Không có buổi học nào trong 7 ngày tới."))
                    }
                }
            }
        }
        footer {
            "Mẹo nhỏ: Dùng bộ lọc để tìm nhanh môn học, hoặc bấm nút giao diện để chuyển sáng/tối."
        }
    };

    layout(view.theme, content)
}

/// Page shown when the schedule could not be loaded
pub fn render_error_page(message: &str, theme: &ThemeSettings) -> Markup {
    let content = html! {
        div.container {
            div.card.empty-state.error {
                p.empty-title { "Không thể tải dữ liệu lịch học" }
                p.error-message { (message) }
                a.button href="/" { "Tải lại" }
            }
        }
    };

    layout(theme, content)
}

/// Document shell shared by every page
fn layout(theme: &ThemeSettings, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="vi" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (TITLE) }
                style { (PreEscaped(CSS)) }
                style { (PreEscaped(format!(":root {{ --primary: {}; }}", theme.primary_color))) }
            }
            body data-theme=(theme.mode.as_str()) {
                header.topbar {
                    a.brand href="/" { "📅 " (TITLE) }
                    div.swatches {
                        @for (label, color) in PRESET_COLORS {
                            button.swatch.active[theme.primary_color == *color]
                                type="button"
                                title=(label)
                                data-color=(color)
                                style=(format!("background: {}", color)) {}
                        }
                    }
                    button.theme-toggle #"theme-toggle" type="button" title="Tùy chỉnh giao diện" {
                        (if theme.is_dark() { "☀️" } else { "🌙" })
                    }
                }
                (content)
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn stat_card(label: &str, value: usize, icon: &str) -> Markup {
    html! {
        div.card.stat {
            div.stat-label { (icon) " " (label) }
            div.stat-value { (value) }
        }
    }
}

fn time_range_label(range: TimeRange) -> &'static str {
    match range {
        TimeRange::All => "Tất cả thời gian",
        TimeRange::Today => "Hôm nay",
        TimeRange::ThisWeek => "Tuần này",
        TimeRange::ThisMonth => "Tháng này",
        TimeRange::NextWeek => "Tuần tới",
    }
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "T2",
        Weekday::Tue => "T3",
        Weekday::Wed => "T4",
        Weekday::Thu => "T5",
        Weekday::Fri => "T6",
        Weekday::Sat => "T7",
        Weekday::Sun => "CN",
    }
}

fn render_filters(criteria: &FilterCriteria, subject_names: &[String], visible: usize) -> Markup {
    html! {
        form.card.filters method="get" action="/" {
            input.search type="search" name="q" value=(criteria.search_text)
                placeholder="Tìm kiếm môn học, phòng, nội dung...";
            div.filter-row {
                select name="range" {
                    @for range in TimeRange::ALL {
                        option value=(range.as_str()) selected[criteria.time_range == range] {
                            (time_range_label(range))
                        }
                    }
                }
                button.button type="submit" { "🔍 Tìm" }
                @if !criteria.is_empty() {
                    a.button.secondary href="/" { "Xóa bộ lọc" }
                }
            }
            div.subject-choices {
                @for subject in subject_names {
                    @let style = subjects::style_for(subject);
                    label.subject-chip style=(format!("border-color: {}", style.color)) {
                        input type="checkbox" name="subject" value=(subject)
                            checked[criteria.subjects.contains(subject)];
                        (style.icon) " " (subject)
                    }
                }
            }
            @if !criteria.is_empty() {
                p.result-count {
                    @if visible == 0 {
                        "Không tìm thấy kết quả phù hợp"
                    } @else {
                        "Tìm thấy " (visible) " kết quả"
                    }
                }
            }
        }
    }
}

fn render_calendar(view: &PageView, by_day: &BTreeMap<NaiveDate, Vec<Session>>) -> Markup {
    let year = view.selected.year();
    let month = view.selected.month();
    let weeks = week::month_grid(year, month, view.week_start).unwrap_or_default();

    let first = view.selected.with_day(1).unwrap_or(view.selected);
    let previous = first.checked_sub_months(Months::new(1));
    let next = first.checked_add_months(Months::new(1));

    html! {
        section.card.calendar {
            div.calendar-header {
                @if let Some(previous) = previous {
                    a.nav href=(page_link(view.criteria, previous)) { "‹" }
                }
                h2 { "Tháng " (month) "/" (year) }
                @if let Some(next) = next {
                    a.nav href=(page_link(view.criteria, next)) { "›" }
                }
            }
            div.calendar-grid {
                @for day in view.week_start.days() {
                    div.weekday { (weekday_label(day)) }
                }
                @for week in &weeks {
                    @for date in week {
                        (render_day_cell(view, *date, by_day.get(date).map(Vec::as_slice).unwrap_or(&[])))
                    }
                }
            }
        }
    }
}

fn render_day_cell(view: &PageView, date: NaiveDate, sessions: &[Session]) -> Markup {
    let subject_names = engine::unique_subjects(sessions);
    let overflow = subject_names.len().saturating_sub(MAX_CELL_ICONS);
    let outside = date.month() != view.selected.month();

    html! {
        a.day
            .outside[outside]
            .today[date == view.today]
            .selected[date == view.selected]
            href=(page_link(view.criteria, date)) {
            span.day-number { (date.day()) }
            @if !sessions.is_empty() {
                div.day-icons {
                    @for subject in subject_names.iter().take(MAX_CELL_ICONS) {
                        @let style = subjects::style_for(subject);
                        @let periods = sessions.iter().filter(|s| &s.subject == subject).map(|s| s.periods).sum::<u32>();
                        span.day-icon
                            style=(format!("background: {}; border-color: {}", style.background, style.color))
                            title=(format!("{} ({} tiết)", subject, periods)) {
                            (style.icon)
                        }
                    }
                    @if overflow > 0 {
                        span.day-more { "+" (overflow) }
                    }
                }
                span.day-count { (sessions.len()) }
            }
        }
    }
}

fn render_session_list(sessions: &[Session], today: NaiveDate, show_date: bool, empty: &str) -> Markup {
    html! {
        @if sessions.is_empty() {
            div.empty-state { p { (empty) } }
        } @else {
            div.session-list {
                @for session in sessions {
                    (render_session_card(session, today, show_date))
                }
            }
        }
    }
}

fn render_session_card(session: &Session, today: NaiveDate, show_date: bool) -> Markup {
    let style = subjects::style_for(&session.subject);
    let date = session.date();
    let is_today = date == Some(today);

    html! {
        div.session-card.today[is_today] style=(format!("border-left-color: {}", style.color)) {
            div.session-subject {
                span.session-icon style=(format!("background: {}", style.background)) { (style.icon) }
                (session.subject)
                @if is_today {
                    span.tag.tag-today { "Hôm nay" }
                }
                @if session.is_special() {
                    span.tag.tag-special { "Hoạt động đặc biệt" }
                }
            }
            div.session-meta {
                @if show_date {
                    @if let Some(date) = date {
                        span { "📅 " (date.format("%d/%m/%Y")) }
                    }
                }
                span {
                    "🕒 " (session.start_time) " - " (session.end_time)
                    @if let Some(minutes) = session.duration_minutes() {
                        " (" (minutes) " phút)"
                    }
                }
                span.tag { (session.periods) " tiết" }
                span { "📍 " (session.room) }
                span { "👥 " (session.group) }
            }
            @if !session.content.is_empty() {
                div.session-content { (session.content) }
            }
        }
    }
}

fn render_legend() -> Markup {
    html! {
        section.card.legend {
            h2 { "Chú thích" }
            div.legend-items {
                @for (subject, style) in subjects::known_styles() {
                    span.legend-item {
                        span.day-icon style=(format!("background: {}; border-color: {}", style.background, style.color)) {
                            (style.icon)
                        }
                        (subject)
                    }
                }
            }
        }
    }
}

/// Link to the page for `date`, keeping the active criteria
fn page_link(criteria: &FilterCriteria, date: NaiveDate) -> String {
    let mut params = vec![format!("date={}", date.format("%Y-%m-%d"))];

    if !criteria.search_text.is_empty() {
        params.push(format!("q={}", urlencoding::encode(&criteria.search_text)));
    }
    for subject in &criteria.subjects {
        params.push(format!("subject={}", urlencoding::encode(subject)));
    }
    if criteria.time_range != TimeRange::All {
        params.push(format!("range={}", criteria.time_range));
    }

    format!("/?{}", params.join("&"))
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    --bg: #f5f5f5;
    --surface: #ffffff;
    --text: rgba(0, 0, 0, 0.88);
    --muted: rgba(0, 0, 0, 0.55);
    --border: #f0f0f0;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--bg);
    color: var(--text);
    min-height: 100vh;
    line-height: 1.45;
    transition: background 0.3s ease, color 0.3s ease;
}

body[data-theme="dark"] {
    --bg: #000000;
    --surface: #1f1f1f;
    --text: rgba(255, 255, 255, 0.85);
    --muted: rgba(255, 255, 255, 0.6);
    --border: #434343;
}

.topbar {
    position: sticky;
    top: 0;
    z-index: 10;
    display: flex;
    align-items: center;
    justify-content: space-between;
    padding: 14px 24px;
    background: linear-gradient(135deg, var(--primary) 0%, #764ba2 100%);
    box-shadow: 0 2px 8px rgba(0, 0, 0, 0.1);
}

body[data-theme="dark"] .topbar {
    background: linear-gradient(135deg, #2c3e50 0%, #34495e 100%);
}

.brand {
    color: #fff;
    font-size: 1.6em;
    font-weight: 700;
    text-decoration: none;
}

.swatches {
    display: flex;
    gap: 6px;
    margin-left: auto;
    margin-right: 12px;
}

.swatch {
    width: 20px;
    height: 20px;
    border: 2px solid rgba(255, 255, 255, 0.5);
    border-radius: 50%;
    cursor: pointer;
}

.swatch.active {
    border-color: #fff;
    box-shadow: 0 0 0 2px rgba(0, 0, 0, 0.25);
}

.theme-toggle {
    font-size: 1.3em;
    background: rgba(255, 255, 255, 0.2);
    border: 1px solid rgba(255, 255, 255, 0.3);
    border-radius: 50%;
    width: 40px;
    height: 40px;
    cursor: pointer;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 24px;
}

.card {
    background: var(--surface);
    border: 1px solid var(--border);
    border-radius: 12px;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.08);
    padding: 16px;
    margin-bottom: 24px;
}

.card h2 {
    font-size: 1.1em;
    margin-bottom: 12px;
}

.filters .search {
    width: 100%;
    padding: 10px 16px;
    border-radius: 999px;
    border: 1px solid var(--border);
    font-size: 1em;
    background: var(--surface);
    color: var(--text);
}

.filter-row {
    display: flex;
    gap: 8px;
    margin-top: 12px;
    flex-wrap: wrap;
}

.filter-row select {
    padding: 6px 12px;
    border-radius: 999px;
    border: 1px solid var(--border);
    background: var(--surface);
    color: var(--text);
}

.button {
    display: inline-block;
    padding: 6px 16px;
    border-radius: 999px;
    border: none;
    background: var(--primary);
    color: #fff;
    text-decoration: none;
    cursor: pointer;
}

.button.secondary {
    background: transparent;
    color: var(--text);
    border: 1px solid var(--border);
}

.subject-choices {
    display: flex;
    flex-wrap: wrap;
    gap: 6px;
    margin-top: 12px;
}

.subject-chip {
    border: 2px solid;
    border-radius: 999px;
    padding: 2px 10px;
    font-size: 0.85em;
    cursor: pointer;
}

.result-count {
    margin-top: 10px;
    color: var(--muted);
    font-size: 0.9em;
}

.stats {
    display: grid;
    grid-template-columns: repeat(4, 1fr);
    gap: 16px;
}

.stat-label {
    color: var(--muted);
    font-size: 0.9em;
}

.stat-value {
    font-size: 2em;
    font-weight: 700;
    color: var(--primary);
}

.layout {
    display: grid;
    grid-template-columns: 2fr 1fr;
    gap: 24px;
}

.calendar-header {
    display: flex;
    align-items: center;
    justify-content: space-between;
}

.calendar-header .nav {
    font-size: 1.5em;
    text-decoration: none;
    color: var(--primary);
    padding: 0 12px;
}

.calendar-grid {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
    gap: 4px;
}

.weekday {
    text-align: center;
    font-weight: 700;
    color: var(--muted);
    padding: 4px 0;
}

.day {
    position: relative;
    min-height: 76px;
    padding: 4px;
    border-radius: 8px;
    border: 1px solid var(--border);
    color: var(--text);
    text-decoration: none;
    transition: all 0.2s ease;
}

.day:hover {
    border-color: var(--primary);
}

.day.outside {
    opacity: 0.4;
}

.day.today .day-number {
    color: #fff;
    background: #52c41a;
    border-radius: 50%;
    padding: 0 6px;
}

.day.selected {
    border: 2px solid var(--primary);
}

.day-icons {
    display: flex;
    flex-wrap: wrap;
    gap: 2px;
    margin-top: 4px;
}

.day-icon {
    display: inline-flex;
    align-items: center;
    justify-content: center;
    width: 24px;
    height: 24px;
    border: 2px solid;
    border-radius: 50%;
    font-size: 0.75em;
}

.day-more {
    font-size: 0.75em;
    color: var(--muted);
}

.day-count {
    position: absolute;
    top: 4px;
    right: 6px;
    font-size: 0.7em;
    color: var(--muted);
}

.session-list {
    display: grid;
    gap: 12px;
}

.session-card {
    border: 1px solid var(--border);
    border-left: 4px solid;
    border-radius: 12px;
    padding: 12px;
}

.session-card.today {
    border-color: #52c41a;
}

.session-subject {
    display: flex;
    align-items: center;
    gap: 8px;
    font-weight: 700;
}

.session-icon {
    display: inline-flex;
    align-items: center;
    justify-content: center;
    width: 28px;
    height: 28px;
    border-radius: 50%;
}

.session-meta {
    display: flex;
    flex-wrap: wrap;
    gap: 10px;
    margin-top: 6px;
    font-size: 0.85em;
    color: var(--muted);
}

.session-content {
    margin-top: 8px;
    font-size: 0.9em;
}

.tag {
    display: inline-block;
    font-size: 0.75em;
    padding: 0 8px;
    border-radius: 4px;
    border: 1px solid var(--border);
}

.tag-today {
    color: #52c41a;
    border-color: #b7eb8f;
}

.tag-special {
    color: #faad14;
    border-color: #ffe58f;
}

.legend-items {
    display: flex;
    flex-wrap: wrap;
    gap: 12px;
}

.legend-item {
    display: inline-flex;
    align-items: center;
    gap: 6px;
    font-size: 0.85em;
}

.empty-state {
    padding: 24px 12px;
    text-align: center;
    color: var(--muted);
}

.empty-title {
    font-weight: 700;
    margin-bottom: 8px;
}

.error-message {
    margin-bottom: 16px;
}

footer {
    text-align: center;
    padding: 12px 24px 32px;
    color: var(--muted);
    font-size: 0.85em;
}

@media (max-width: 768px) {
    .stats {
        grid-template-columns: repeat(2, 1fr);
    }

    .layout {
        grid-template-columns: 1fr;
    }
}
"#;

const JAVASCRIPT: &str = r#"
// Toggle the theme on the server, or locally when served as a static file
const toggle = document.getElementById('theme-toggle');

function applyTheme(mode) {
    document.body.dataset.theme = mode;
    toggle.textContent = mode === 'dark' ? '☀️' : '🌙';
}

function applyColor(color) {
    document.documentElement.style.setProperty('--primary', color);
    document.querySelectorAll('.swatch').forEach((swatch) => {
        swatch.classList.toggle('active', swatch.dataset.color === color);
    });
}

// Save the chosen primary color, keeping the current mode
document.querySelectorAll('.swatch').forEach((swatch) => {
    swatch.addEventListener('click', async () => {
        const color = swatch.dataset.color;
        try {
            const response = await fetch('/api/theme', {
                method: 'PUT',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ mode: document.body.dataset.theme, primaryColor: color }),
            });
            if (!response.ok) throw new Error(response.status);
            const theme = await response.json();
            applyColor(theme.primaryColor);
        } catch (err) {
            applyColor(color);
        }
    });
});

toggle.addEventListener('click', async () => {
    try {
        const response = await fetch('/api/theme/toggle', { method: 'POST' });
        if (!response.ok) throw new Error(response.status);
        const theme = await response.json();
        applyTheme(theme.mode);
    } catch (err) {
        applyTheme(document.body.dataset.theme === 'dark' ? 'light' : 'dark');
    }
});
"#;
