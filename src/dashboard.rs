use std::io;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Sparkline},
    Frame, Terminal,
};
use tracing::info;

use crate::analyzer::McpAnalyzer;
use crate::feed::PacketUpdate;
use crate::insights::{self, MetricHistory};
use crate::models::domain::{AnalysisMetric, DashboardData, PacketRecord};
use crate::stats::ProtocolStats;

// Keep the live record window bounded, like the analyzer history.
const MAX_RECORDS: usize = 10_000;

/// Live dashboard loop: drain the feed channel, recompute stats only when new
/// records arrived, redraw, quit on `q` or Esc.
pub fn run_dashboard(
    rx: Receiver<PacketUpdate>,
    anomaly_threshold: f64,
    trend_window: usize,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut records: Vec<PacketRecord> = Vec::new();
    let mut analyzer = McpAnalyzer::new(anomaly_threshold);
    let mut history = MetricHistory::new(trend_window);
    let mut anomalies_total: u64 = 0;
    let mut stats = ProtocolStats::new();
    let mut data = insights::dashboard_data(&history, &stats, anomalies_total);

    terminal.clear()?;
    loop {
        let mut new_frames: Vec<Vec<u8>> = Vec::new();
        while let Ok(update) = rx.try_recv() {
            records.push(update.record);
            new_frames.push(update.frame);
        }
        if records.len() > MAX_RECORDS {
            let excess = records.len() - MAX_RECORDS;
            records.drain(..excess);
        }

        // Recomputation happens exactly when the input sequence changed,
        // not on every draw.
        if !new_frames.is_empty() {
            anomalies_total += analyzer.detect_anomalies(&new_frames).len() as u64;
            stats = ProtocolStats::from_records(&records);
            history.record(&stats, anomalies_total);
            data = insights::dashboard_data(&history, &stats, anomalies_total);
        }

        terminal.draw(|f| render_dashboard(f, &data, &stats))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!(packets = records.len(), "dashboard closed");
    Ok(())
}

/// Draw the whole dashboard: metric cards on top, insights and
/// recommendations side by side, protocol analysis at the bottom.
pub fn render_dashboard(f: &mut Frame, data: &DashboardData, stats: &ProtocolStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(8),
            Constraint::Length(9),
        ])
        .split(f.size());

    draw_metric_cards(f, chunks[0], &data.analysis);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    draw_text_panel(f, middle[0], " Key Insights ", &data.insights);
    draw_text_panel(f, middle[1], " Recommendations ", &data.recommendations);

    draw_protocol_panel(f, chunks[2], stats);
}

fn draw_metric_cards(f: &mut Frame, area: Rect, metrics: &[AnalysisMetric]) {
    if metrics.is_empty() {
        let block = Block::default().title(" Metrics ").borders(Borders::ALL);
        f.render_widget(
            Paragraph::new("Waiting for analysis data...").block(block),
            area,
        );
        return;
    }

    let constraints: Vec<Constraint> = metrics
        .iter()
        .map(|_| Constraint::Ratio(1, metrics.len() as u32))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (metric, chunk) in metrics.iter().zip(chunks.iter()) {
        draw_metric_card(f, *chunk, metric);
    }
}

fn draw_metric_card(f: &mut Frame, area: Rect, metric: &AnalysisMetric) {
    let block = Block::default()
        .title(format!(" {} ", metric.title))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let value = Paragraph::new(format_value(metric.value))
        .style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(value, rows[0]);

    let change_color = if metric.change >= 0.0 {
        Color::Green
    } else {
        Color::Red
    };
    let change = Paragraph::new(format_change(metric.change))
        .style(Style::default().fg(change_color));
    f.render_widget(change, rows[1]);

    // borderless trend line
    let series = scale_series(&metric.data);
    let sparkline = Sparkline::default()
        .data(&series)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(sparkline, rows[2]);
}

fn draw_text_panel(f: &mut Frame, area: Rect, title: &str, entries: &[String]) {
    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, text)| ListItem::new(format!("{}. {}", i + 1, text)))
        .collect();
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(Style::default().fg(Color::White));
    f.render_widget(list, area);
}

fn draw_protocol_panel(f: &mut Frame, area: Rect, stats: &ProtocolStats) {
    let mut lines = vec![
        Line::from(format!("Total Packets: {}", stats.total_packets)),
        Line::from(format!(
            "Average Packet Size: {:.2} bytes",
            stats.average_size
        )),
        Line::from("Protocol Distribution:"),
    ];
    for (protocol, count) in stats.distribution() {
        lines.push(Line::from(format!("  {protocol}: {count} packets")));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .title(" Protocol Analysis ")
            .borders(Borders::ALL),
    );
    f.render_widget(panel, area);
}

/// Signed percentage, `+`-prefixed when non-negative.
pub fn format_change(change: f64) -> String {
    if change >= 0.0 {
        format!("+{change:.1}%")
    } else {
        format!("{change:.1}%")
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Sparkline takes unsigned integers; rescale the series so its shape
/// survives for small fractional values.
fn scale_series(data: &[(String, f64)]) -> Vec<u64> {
    let max = data.iter().map(|(_, v)| *v).fold(0.0f64, f64::max);
    if max <= 0.0 {
        return vec![0; data.len()];
    }
    data.iter()
        .map(|(_, v)| ((v / max) * 100.0).round().max(0.0) as u64)
        .collect()
}
