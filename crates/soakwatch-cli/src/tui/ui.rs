//! Dashboard rendering.
//!
//! ┌──────────────────────────────────────────────────────────┐
//! │  soakwatch   medium   tick 42/150   84s   logs/soak.csv  │
//! ├───────────────────┬──────────────────────────────────────┤
//! │  Temperatures     │  ╭ cpu / bus °C                      │
//! │  cpu   61.0°C     │  │   ~~~~~~~~~~                      │
//! │  s1    38.5°C     │  ╰──────────────────────────         │
//! │  s2    no data    ├──────────────────────────────────────┤
//! │  [cpu 72%  ]      │  Stress                              │
//! ├───────────────────┴──────────────────────────────────────┤
//! │  Endpoints 10/11 up                                      │
//! │  hazard_cam     192.168.11.9   UP     0.4 ms             │
//! ├──────────────────────────────────────────────────────────┤
//! │  q: stop and quit                                        │
//! └──────────────────────────────────────────────────────────┘

use super::app::App;
use ratatui::{prelude::*, widgets::*};

use soakwatch_core::{LinkStatus, Snapshot, is_valid_pct, is_valid_temp};

use crate::commands::{fmt_pct, fmt_temp};

/// Temperature bands: hot, warm, normal, cool. Sentinels are grey.
pub fn temp_color(celsius: f64) -> Color {
    if !is_valid_temp(celsius) {
        Color::DarkGray
    } else if celsius >= 80.0 {
        Color::Red
    } else if celsius >= 60.0 {
        Color::Yellow
    } else if celsius >= 40.0 {
        Color::Green
    } else {
        Color::Blue
    }
}

/// Utilization bands. Sentinels are grey.
pub fn load_color(pct: f64) -> Color {
    if !is_valid_pct(pct) {
        Color::DarkGray
    } else if pct >= 80.0 {
        Color::Red
    } else if pct >= 60.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn link_color(status: LinkStatus) -> Color {
    match status {
        LinkStatus::Up => Color::Green,
        LinkStatus::Down => Color::Red,
        LinkStatus::Timeout => Color::Yellow,
        LinkStatus::Error => Color::Magenta,
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // title
            Constraint::Length(12), // temperatures + chart + stress
            Constraint::Min(6),     // endpoints
            Constraint::Length(1),  // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(30)])
        .split(rows[1]);
    draw_readings(f, top[0], app.latest());

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(top[1]);
    draw_chart(f, right[0], app);
    draw_stress(f, right[1], app.latest());

    draw_endpoints(f, rows[2], app.latest());
    draw_keys(f, rows[3], app.stopping());
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let h = app.header();
    let tick = app
        .latest()
        .map(|s| format!("tick {}/{}", s.tick + 1, h.planned_ticks))
        .unwrap_or_else(|| "waiting for first tick".into());
    let stress = if h.stress { "" } else { "  (stress off)" };
    let dropped = app
        .latest()
        .map(|s| (s.tick + 1).saturating_sub(app.received()))
        .unwrap_or(0);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" soakwatch ", Style::default().bold().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(h.level.name(), Style::default().bold().fg(Color::Yellow)),
            Span::styled(stress, Style::default().fg(Color::DarkGray)),
        ]));

    let text = Line::from(vec![
        Span::raw(format!(" {tick}   ")),
        Span::styled(
            format!(
                "{:.0}s / {:.0}s   every {:.1}s   ",
                app.elapsed().as_secs_f64(),
                h.duration.as_secs_f64(),
                h.interval.as_secs_f64()
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(h.csv_log.display().to_string()),
    ]);
    let text = if dropped > 0 {
        let mut spans = text.spans;
        spans.push(Span::styled(
            format!("   {dropped} frame(s) dropped"),
            Style::default().fg(Color::Red),
        ));
        Line::from(spans)
    } else {
        text
    };
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn temp_line(label: &str, celsius: f64) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {label:<5}"), Style::default().bold()),
        Span::styled(fmt_temp(celsius), Style::default().fg(temp_color(celsius))),
    ])
}

fn load_gauge(label: &str, pct: f64) -> Gauge<'static> {
    let ratio = if is_valid_pct(pct) {
        (pct / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Gauge::default()
        .gauge_style(Style::default().fg(load_color(pct)).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{label} {}", fmt_pct(pct)))
}

fn draw_readings(f: &mut Frame, area: Rect, latest: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title(" Readings ");
    let Some(s) = latest else {
        let p = Paragraph::new("no data yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // temperatures
            Constraint::Length(1), // cpu
            Constraint::Length(1), // mem
            Constraint::Length(1), // disk
            Constraint::Min(0),
        ])
        .split(inner);

    let mut lines = vec![
        temp_line("cpu", s.resources.cpu_temp_c),
        temp_line("s1", s.bus.sensor1_c),
        temp_line("s2", s.bus.sensor2_c),
    ];
    if let Some(err) = &s.bus.error {
        lines.push(Line::styled(
            format!(" bus: {err}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(lines), parts[0]);
    f.render_widget(load_gauge("cpu", s.resources.cpu_pct), parts[1]);
    f.render_widget(load_gauge("mem", s.resources.mem_pct), parts[2]);
    f.render_widget(load_gauge("disk", s.resources.disk_pct), parts[3]);
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App) {
    let cpu = app.cpu_points();
    let bus = app.bus_points();

    if cpu.is_empty() && bus.is_empty() {
        let p = Paragraph::new("no temperature data yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Temperature "));
        f.render_widget(p, area);
        return;
    }

    let all = cpu.iter().chain(bus.iter()).map(|&(_, c)| c);
    let (lo, hi) = all.fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c), hi.max(c)));
    let y_min = (lo - 2.0).floor();
    let y_max = (hi + 2.0).ceil();
    let x_max = cpu
        .iter()
        .chain(bus.iter())
        .map(|&(x, _)| x)
        .fold(10.0, f64::max);

    let datasets = vec![
        Dataset::default()
            .name("cpu")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .data(&cpu),
        Dataset::default()
            .name("s1")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .data(&bus),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(" Temperature (°C) "))
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format!("{y_min:.0}")),
            Line::from(format!("{y_max:.0}")),
        ]));
    f.render_widget(chart, area);
}

fn draw_stress(f: &mut Frame, area: Rect, latest: Option<&Snapshot>) {
    let rows: Vec<Row> = latest
        .map(|s| {
            s.stress
                .iter()
                .map(|(kind, r)| {
                    let (status, text, color) = if r.is_success() {
                        ("ok", r.detail.clone(), Color::Green)
                    } else {
                        ("FAIL", r.error.clone().unwrap_or_default(), Color::Red)
                    };
                    Row::new(vec![
                        kind.to_string(),
                        status.to_string(),
                        format!("{:.2}s", r.duration.as_secs_f64()),
                        text,
                    ])
                    .style(Style::default().fg(color))
                })
                .collect()
        })
        .unwrap_or_default();

    let title = if rows.is_empty() {
        " Stress (idle) "
    } else {
        " Stress "
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(8), // kind
            Constraint::Length(5), // status
            Constraint::Length(7), // time
            Constraint::Min(10),   // detail
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn draw_endpoints(f: &mut Frame, area: Rect, latest: Option<&Snapshot>) {
    let (rows, title): (Vec<Row>, String) = match latest {
        Some(s) => {
            let rows = s
                .reachability
                .iter()
                .map(|ep| {
                    let latency = ep
                        .latency_ms
                        .map(|ms| format!("{ms:.1} ms"))
                        .unwrap_or_else(|| "—".into());
                    Row::new(vec![
                        ep.id.clone(),
                        ep.category.to_string(),
                        ep.address.clone(),
                        ep.status.to_string(),
                        latency,
                    ])
                    .style(Style::default().fg(link_color(ep.status)))
                })
                .collect();
            let title = if s.endpoint_count() == 0 {
                " Endpoints (probing off) ".to_string()
            } else {
                format!(" Endpoints {}/{} up ", s.up_count(), s.endpoint_count())
            };
            (rows, title)
        }
        None => (Vec::new(), " Endpoints ".to_string()),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(18), // id
            Constraint::Length(8),  // category
            Constraint::Length(16), // address
            Constraint::Length(8),  // status
            Constraint::Length(10), // latency
        ],
    )
    .header(
        Row::new(vec!["id", "kind", "address", "status", "latency"])
            .style(Style::default().bold()),
    )
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn draw_keys(f: &mut Frame, area: Rect, stopping: bool) {
    let text = if stopping {
        " stopping after the current tick..."
    } else {
        " q / esc: stop and quit"
    };
    let bar = Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
