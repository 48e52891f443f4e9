//! Interactive test taking on stdin.

use anyhow::Result;
use services::{AppServices, SessionError, SessionPhase, TestSession};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::resolve_test;

/// One line typed by the examinee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    /// Zero-based option index.
    Choose(usize),
    Next,
    Previous,
    Finish,
    Cancel,
    Show,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return match n.checked_sub(1) {
            Some(index) => Input::Choose(index),
            None => Input::Unknown,
        };
    }
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "f" | "finish" => Input::Finish,
        "c" | "cancel" => Input::Cancel,
        "" | "s" | "show" => Input::Show,
        _ => Input::Unknown,
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_help() {
    println!("Type an option number to choose it, n/p to move, f to finish, c to cancel.");
}

fn print_current(session: &TestSession) {
    let status = session.status();
    let current = session.current_question();
    println!();
    println!(
        "Question {}/{}  ({}s left, {} answered)",
        current.index + 1,
        current.total,
        status.remaining_secs,
        status.answered
    );
    println!("{}", current.text);
    for (i, option) in current.options.iter().enumerate() {
        let marker = if current.highlighted == Some(i) { '>' } else { ' ' };
        println!(" {marker} {}. {option}", i + 1);
    }
}

fn print_outcome(session: &TestSession) {
    match session.result() {
        Some(result) => println!(
            "Result for {}: {}/{} ({:.1}%) in {}s.",
            result.examinee(),
            result.score(),
            result.max_score(),
            result.percent(),
            result.elapsed_secs()
        ),
        None => println!("Session cancelled; nothing was recorded."),
    }
}

/// Next input line, or `None` once the session ended or stdin closed.
async fn read_line(
    lines: &mut Lines<BufReader<Stdin>>,
    session: &TestSession,
) -> Result<Option<String>> {
    tokio::select! {
        phase = session.wait_finished() => {
            if phase == SessionPhase::Finished {
                println!();
                println!("Time is up.");
            }
            Ok(None)
        }
        line = lines.next_line() => Ok(line?),
    }
}

/// Ask before cancelling; the countdown is held while the prompt is open.
async fn confirm_cancel(
    lines: &mut Lines<BufReader<Stdin>>,
    session: &TestSession,
) -> Result<Result<bool, SessionError>> {
    if let Err(err) = session.pause_timer() {
        return Ok(Err(err));
    }
    println!("Cancel this attempt? Nothing will be recorded. [y/N]");
    let outcome = match read_line(lines, session).await? {
        Some(answer) if is_yes(&answer) => {
            session.cancel();
            Ok(false)
        }
        Some(_) => session.resume_timer().map(|()| true),
        None => Ok(false),
    };
    Ok(outcome)
}

pub async fn execute(
    app: &AppServices,
    reference: &str,
    examinee: &str,
    group: Option<String>,
) -> Result<()> {
    let test = resolve_test(app, reference).await?;
    let session = app.sessions().start(&test, examinee, group).await?;

    println!(
        "{}: {} question(s), {} seconds.",
        test.name(),
        session.status().total,
        test.time_limit_secs()
    );
    print_help();
    print_current(&session);

    let mut lines = lines_of_stdin();
    while !session.phase().is_terminal() {
        let Some(line) = read_line(&mut lines, &session).await? else {
            if !session.phase().is_terminal() {
                // stdin closed before the examinee finished
                session.cancel();
            }
            break;
        };

        let outcome = match parse_input(&line) {
            Input::Choose(index) => session.select_answer(index).map(|()| true),
            Input::Next => session.next().map(|_| true),
            Input::Previous => session.previous().map(|_| true),
            Input::Show => Ok(true),
            Input::Finish => session.finish().await.map(|_| false),
            Input::Cancel => confirm_cancel(&mut lines, &session).await?,
            Input::Unknown => {
                print_help();
                Ok(false)
            }
        };

        match outcome {
            Ok(true) => print_current(&session),
            Ok(false) => {}
            Err(err) => println!("{err}"),
        }
    }

    print_outcome(&session);
    Ok(())
}

fn lines_of_stdin() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_choose_one_based_options() {
        assert_eq!(parse_input("1"), Input::Choose(0));
        assert_eq!(parse_input(" 3 "), Input::Choose(2));
        assert_eq!(parse_input("0"), Input::Unknown);
    }

    #[test]
    fn letters_map_to_commands() {
        assert_eq!(parse_input("n"), Input::Next);
        assert_eq!(parse_input("P"), Input::Previous);
        assert_eq!(parse_input("finish"), Input::Finish);
        assert_eq!(parse_input("c"), Input::Cancel);
        assert_eq!(parse_input(""), Input::Show);
        assert_eq!(parse_input("what"), Input::Unknown);
    }

    #[test]
    fn only_yes_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }
}
