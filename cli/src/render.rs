use std::collections::HashMap;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use heist_core::host::RunLangOutput;
use heist_core::verdict::{PassState, ResultDisplay, TestCase};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false;
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for PassState {
    fn color(&self) -> Color {
        use PassState::*;
        if !self::is_truecolor_supported() {
            return match self {
                Pass => Color::Green,
                Fail => Color::Red,
                Warning => Color::Yellow,
                Info => Color::Blue,
            };
        }

        match self {
            Pass => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            Fail => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            Warning => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            Info => Color::TrueColor {
                r: 40,
                g: 120,
                b: 220,
            },
        }
    }
}

pub fn pass_icon(pass: PassState) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", pass).on_color(pass.color()).bold().color(fg)
}

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

fn print_sub_title(s: &str, cols: usize) {
    println!(
        "{}{}",
        s.cyan().bold(),
        THIN_LINE
            .repeat(cols.saturating_sub(s.len() + 1))
            .bright_black(),
    )
}

fn print_lines(entire_str: &str) {
    let lines: Vec<_> = entire_str.lines().collect();
    if lines.is_empty() {
        println!("{}", "<EMPTY>".magenta().dimmed());
        return;
    }
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        print!("{}", trimmed);

        let num_trailing_whitespace = line.len() - trimmed.len();
        if num_trailing_whitespace > 0 {
            print!(
                "{}{}",
                " ".repeat(num_trailing_whitespace).on_red(),
                "(Trailing whitespace)".bright_red().bold()
            );
        }

        let is_last_line = i + 1 == lines.len();
        if is_last_line && !entire_str.ends_with('\n') {
            print!("{}", " Missing new line ".on_yellow().black().bold());
        }

        println!();
    }
}

pub fn print_test_case(index: usize, case: &TestCase, cols: usize) {
    let title = match &case.name {
        Some(name) => name.clone(),
        None => format!("Test #{}", index + 1),
    };
    println!(
        "\n{}: {}",
        title.color(Color::BrightYellow).bold(),
        self::pass_icon(case.pass)
    );

    match &case.result_display {
        ResultDisplay::Empty => {}
        ResultDisplay::Text(text) => println!("{}", text),
        ResultDisplay::Diff {
            expected,
            output,
            input,
            ..
        } => {
            if let Some(input) = input {
                print_sub_title("[input]", cols);
                print_lines(input);
            }
            print_sub_title("[expected]", cols);
            print_lines(expected);
            print_sub_title("[output]", cols);
            print_lines(output);
        }
        ResultDisplay::Run {
            input,
            output,
            error,
        } => {
            if let Some(input) = input {
                print_sub_title("[input]", cols);
                print_lines(input);
            }
            print_sub_title("[stdout]", cols);
            print_lines(output);
            if !error.is_empty() {
                print_sub_title("[stderr]", cols);
                print!("{}", error);
            }
        }
    }
}

/// One-line tally such as `3/5 tests failed (Fail x2, Warning x1)`.
pub fn summary_line(cases: &[TestCase]) -> String {
    let count: HashMap<PassState, usize> = cases.iter().fold(HashMap::new(), |mut count, c| {
        *count.entry(c.pass).or_default() += 1;
        count
    });

    let num_failed = cases.iter().filter(|c| c.is_failure()).count();
    if num_failed == 0 {
        return format!("All {} tests passed", cases.len());
    }

    let mut detail: Vec<_> = count
        .iter()
        .filter(|(&pass, _)| pass != PassState::Pass && pass != PassState::Info)
        .map(|(&pass, &cnt)| (pass.to_string(), cnt))
        .collect();
    detail.sort();
    let detail = detail
        .into_iter()
        .map(|(pass, cnt)| format!("{} x{}", pass, cnt))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{}/{} tests failed ({})", num_failed, cases.len(), detail)
}

pub fn print_run_lang_output(output: &RunLangOutput) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    for (i, case) in output.tests.test_cases.iter().enumerate() {
        print_test_case(i, case, cols);
    }
    println!("{}", bold_bar);

    let bar = "-".repeat(5);
    let summary = summary_line(&output.tests.test_cases);
    if output.tests.pass {
        println!("{} {} {}", bar, summary.green(), bar);
    } else {
        println!("{} {} {}", bar, summary.bright_red(), bar);
    }

    let verdict = if output.tests.pass {
        "PASS".green().bold()
    } else {
        "FAIL".bright_red().bold()
    };
    match output.tests.points {
        Some(points) => println!("Verdict: {} ({} points)", verdict, points),
        None => println!("Verdict: {}", verdict),
    }
    if output.timed_out {
        println!("{}", "Judge timed out".bright_red().bold());
    }
    let timers = &output.timers;
    println!(
        "{}",
        format!(
            "runtime {}ms (compile {}ms, run {}ms, judge {}ms)",
            output.runtime.as_millis(),
            timers.compile.as_millis(),
            timers.run.as_millis(),
            timers.judge.as_millis(),
        )
        .dimmed()
    );

    if !output.stderr.is_empty() {
        print_sub_title("[judge stderr]", cols);
        print!("{}", output.stderr);
        if !output.stderr.ends_with('\n') {
            println!();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn case(pass: PassState) -> TestCase {
        TestCase {
            name: None,
            pass,
            result_display: ResultDisplay::Empty,
        }
    }

    #[test]
    fn summary_counts_failures_only() {
        use PassState::*;
        assert_eq!(
            summary_line(&[case(Pass), case(Info), case(Warning)]),
            "All 3 tests passed"
        );
        assert_eq!(
            summary_line(&[case(Pass), case(Fail), case(Warning), case(Fail), case(Info)]),
            "2/5 tests failed (Fail x2, Warning x1)"
        );
    }
}
