use eyre::Context;
use jiff::Timestamp;
use std::io::IsTerminal;
use subswipe::oauth::OAuthConfig;
use subswipe::{
    BULK_DELETE_DELAY, BulkRefusal, Channel, ChannelDirectory, DeleteReport, Direction,
    EffectRunner, Mode, Phase, Session, UndoOutcome, demo, run_bulk_unsubscribe,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

/// What to do once a review session ends.
enum Flow {
    Landing,
    Exit,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!();
        println!("SubSwipe: keep or drop your YouTube subscriptions");
        println!("  [d] try the demo   [l] connect YouTube   [q] quit");
        let Some(choice) = prompt(&mut input, "> ").await? else {
            return Ok(());
        };
        let flow = match choice.as_str() {
            "d" => {
                let session = Session::demo(demo::demo_channels(Timestamp::now()));
                review(&mut input, session, None).await?
            }
            "l" => match connect(&mut input).await? {
                Some((session, directory)) => review(&mut input, session, Some(directory)).await?,
                None => Flow::Landing,
            },
            "q" => Flow::Exit,
            "" => Flow::Landing,
            other => {
                println!("Unknown choice `{other}`.");
                Flow::Landing
            }
        };
        if let Flow::Exit = flow {
            return Ok(());
        }
    }
}

/// Prints `question` and reads one trimmed line. `None` once stdin is closed.
async fn prompt(input: &mut Input, question: &str) -> eyre::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(question.as_bytes())
        .await
        .context("write prompt")?;
    stdout.flush().await.context("flush prompt")?;
    let line = input.next_line().await.context("read from terminal")?;
    Ok(line.map(|l| l.trim().to_string()))
}

/// Runs the consent flow and loads the account's subscriptions.
///
/// Every failure is reported and leads back to the landing choice.
async fn connect(input: &mut Input) -> eyre::Result<Option<(Session, ChannelDirectory)>> {
    let Some(client_id) = prompt(input, "OAuth client id: ").await? else {
        return Ok(None);
    };
    if client_id.is_empty() {
        println!("A client id is needed to connect.");
        return Ok(None);
    }
    let mut config = OAuthConfig::new(client_id);
    if let Some(secret) = prompt(input, "Client secret (leave empty if none): ").await?
        && !secret.is_empty()
    {
        config = config.with_client_secret(secret);
    }

    println!("Check your browser to sign in to Google.");
    let directory = match ChannelDirectory::connect(config).await {
        Ok(directory) => directory,
        Err(e) => {
            tracing::warn!(error = ?e, "connect failed");
            println!("{e}");
            return Ok(None);
        }
    };
    if !directory.validate().await {
        println!("YouTube did not accept the access token. Try connecting again.");
        return Ok(None);
    }

    println!("Loading your subscriptions...");
    let channels = match directory.list_subscriptions().await {
        Ok(channels) => channels,
        Err(e) => {
            tracing::warn!(error = ?e, "listing subscriptions failed");
            println!("Could not load subscriptions: {e}");
            return Ok(None);
        }
    };
    if channels.is_empty() {
        println!("No subscriptions found on this account.");
        return Ok(None);
    }

    let session = Session::live(channels, directory.can_write());
    Ok(Some((session, directory)))
}

async fn review(
    input: &mut Input,
    mut session: Session,
    directory: Option<ChannelDirectory>,
) -> eyre::Result<Flow> {
    let mut runner = directory.clone().map(EffectRunner::new);

    loop {
        if let Some((_, reports)) = &mut runner {
            drain_reports(&mut session, reports);
        }

        println!();
        println!("{}", banner(session.mode()));
        if session.is_bin_open() {
            show_bin(&session);
        }
        match session.phase() {
            Phase::Reviewing => {
                if let Some(channel) = session.current() {
                    show_card(channel, session.pending().len());
                }
                println!("  [k] keep   [r] remove   [b] bin   [u <n|id>] undo   [x] unsubscribe all in bin   [q] quit");
            }
            Phase::Finished => {
                let stats = session.stats();
                println!("All done! You reviewed {} channels.", stats.total);
                println!("  kept: {}   removed: {}", stats.kept, stats.removed);
                println!("  [b] bin   [u <n|id>] undo   [x] unsubscribe all in bin   [q] back to start");
            }
        }

        let Some(line) = prompt(input, "> ").await? else {
            return Ok(Flow::Exit);
        };
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line.as_str(), ""),
        };

        match command {
            "k" => swipe(&mut session, runner.as_ref(), Direction::Keep),
            "r" => swipe(&mut session, runner.as_ref(), Direction::Remove),
            "b" => {
                session.toggle_bin();
            }
            "u" => undo(&mut session, argument),
            "x" => {
                let Some(directory) = &directory else {
                    println!("{}", BulkRefusal::DemoMode);
                    continue;
                };
                bulk_unsubscribe(input, &mut session, directory).await?;
            }
            "q" => return Ok(Flow::Landing),
            "" => {}
            other => println!("Unknown command `{other}`."),
        }
    }
}

fn banner(mode: Mode) -> &'static str {
    match mode {
        Mode::Demo => "DEMO MODE: No real changes.",
        Mode::Live {
            write_granted: true,
        } => "REAL MODE: Actions are permanent.",
        Mode::Live {
            write_granted: false,
        } => "REAL MODE (read only): permission to unsubscribe was not granted.",
    }
}

fn show_card(channel: &Channel, remaining: usize) {
    println!("[{remaining} left] {} ({})", channel.name, channel.category);
    print!(
        "  {} subscribers, last upload {}",
        channel.subscribers, channel.last_upload
    );
    if channel.is_inactive {
        print!("  [inactive]");
    }
    println!();
    if !channel.description.is_empty() {
        println!("  {}", channel.description);
    }
    if !channel.avatar.is_empty() {
        println!("  {}", channel.avatar);
    }
}

fn show_bin(session: &Session) {
    if session.bin().is_empty() {
        println!("Bin is empty.");
        return;
    }
    println!("Bin:");
    for (i, channel) in session.bin().iter().enumerate() {
        let mark = if session.is_deleted(channel) {
            "  (unsubscribed)"
        } else {
            ""
        };
        println!("  {:>2}. {} [{}]{mark}", i + 1, channel.name, channel.id);
    }
}

fn swipe(
    session: &mut Session,
    runner: Option<&(EffectRunner<ChannelDirectory>, UnboundedReceiver<DeleteReport>)>,
    direction: Direction,
) {
    let effects = session.swipe(direction);
    if let Some((runner, _)) = runner {
        // outcomes come back through the report channel
        drop(runner.run(effects));
    }
}

fn undo(session: &mut Session, argument: &str) {
    // `u 2` is the second entry of the bin listing, anything else a channel id
    let channel = match argument.parse::<usize>() {
        Ok(n) if n >= 1 => session.bin().get(n - 1),
        _ => session.bin().iter().find(|c| c.id == argument),
    };
    let Some(channel) = channel.cloned() else {
        println!("Nothing in the bin matches `{argument}`.");
        return;
    };
    match session.undo(&channel.id) {
        UndoOutcome::Restored => println!("Restored {}.", channel.name),
        UndoOutcome::NotInBin => println!("{} is not in the bin.", channel.name),
        UndoOutcome::AlreadyDeleted => println!(
            "Already unsubscribed from {}. Subscribe again on YouTube if that was a mistake.",
            channel.name
        ),
    }
}

/// Folds finished background deletes into the session. Failures were already logged by the
/// runner and are not shown per channel.
fn drain_reports(session: &mut Session, reports: &mut UnboundedReceiver<DeleteReport>) {
    while let Ok(report) = reports.try_recv() {
        session.record_delete(&report);
    }
}

async fn bulk_unsubscribe(
    input: &mut Input,
    session: &mut Session,
    directory: &ChannelDirectory,
) -> eyre::Result<()> {
    // an unconfirmed request runs every guard but never starts
    if let Err(refusal) = session.begin_bulk_unsubscribe(false)
        && refusal != BulkRefusal::NotConfirmed
    {
        println!("Cannot unsubscribe: {refusal}.");
        return Ok(());
    }

    let question = format!(
        "Unsubscribe from {} channels in the bin? This cannot be undone. [y/N] ",
        session.bulk_candidate_count()
    );
    let confirmed = prompt(input, &question)
        .await?
        .is_some_and(|answer| answer.eq_ignore_ascii_case("y"));

    let plan = match session.begin_bulk_unsubscribe(confirmed) {
        Ok(plan) => plan,
        Err(BulkRefusal::NotConfirmed) => return Ok(()),
        Err(refusal) => {
            println!("Cannot unsubscribe: {refusal}.");
            return Ok(());
        }
    };
    let summary = run_bulk_unsubscribe(&plan, directory, BULK_DELETE_DELAY).await;
    session.finish_bulk_unsubscribe(&summary);
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str) -> Channel {
        Channel {
            id: id.to_string(),
            subscription_id: Some(format!("sub-{id}")),
            name: format!("Chan {id}"),
            avatar: String::new(),
            subscribers: "Unknown".to_string(),
            last_upload: "Unknown".to_string(),
            last_upload_date: None,
            description: String::new(),
            category: "YouTube".to_string(),
            is_inactive: false,
        }
    }

    #[test]
    fn drained_failure_makes_channel_retryable() {
        let mut session = Session::live(vec![channel("one"), channel("two")], true);
        assert_eq!(session.swipe(Direction::Remove).len(), 1);
        assert_eq!(session.swipe(Direction::Remove).len(), 1);
        assert_eq!(session.bulk_candidate_count(), 0);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(DeleteReport {
            subscription_id: "sub-one".to_string(),
            name: "Chan One".to_string(),
            succeeded: false,
        })
        .unwrap();
        tx.send(DeleteReport {
            subscription_id: "sub-two".to_string(),
            name: "Chan Two".to_string(),
            succeeded: true,
        })
        .unwrap();
        drain_reports(&mut session, &mut rx);

        assert!(rx.try_recv().is_err());
        assert_eq!(session.bulk_candidate_count(), 1);
        assert_eq!(session.undo("one"), UndoOutcome::Restored);
        assert_eq!(session.undo("two"), UndoOutcome::AlreadyDeleted);
    }

    #[test]
    fn banner_follows_mode() {
        assert_eq!(banner(Mode::Demo), "DEMO MODE: No real changes.");
        assert_eq!(
            banner(Mode::Live {
                write_granted: true
            }),
            "REAL MODE: Actions are permanent."
        );
    }
}
