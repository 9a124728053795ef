use soullinker_analysis::observability::init_observability;
use soullinker_analysis::prelude::*;

struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_progress(&mut self, p: &ProgressSnapshot) {
        let steps: String = p
            .stage
            .checkmarks()
            .iter()
            .map(|filled| if *filled { '✓' } else { '○' })
            .collect();
        println!(
            "{steps} {:>3}%  {} ({} / {} tokens)",
            p.rounded_percent(),
            p.status_message,
            p.generated_tokens,
            p.total_tokens
        );
    }

    fn on_error(&mut self, failure: &SessionFailure) {
        eprintln!("analysis failed: {}", failure.user_message());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    init_observability("info");
    let client = AnalysisClient::from_env()?;

    let job = client.start(AnalysisRequest::whole_target(1))?;
    let analysis = job.drive(&mut ConsoleObserver).await?;

    println!("{}", analysis.summary);
    Ok(())
}
