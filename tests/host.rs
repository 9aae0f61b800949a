use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use jobwatch::{
    Config, ExitReason, Host, JobError, JobState, JobStream, JobStreamExt, RuntimeError, Task0,
    Task1,
};
use tokio_util::sync::CancellationToken;

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation timed out")
}

fn host(name: &str) -> Host {
    Host::builder(Config::default()).name(name).build()
}

#[tokio::test]
async fn dispose_cancels_runs_and_ends_streams() -> anyhow::Result<()> {
    let host = host("svc");
    host.start(None)?;

    let ctx = host.watch_context::<u32>().build();
    assert_eq!(ctx.name(), "svc-0");
    let task = Task0::new(host.clone(), ctx, |token| async move {
        token.cancelled().await;
        Ok(0)
    });
    let mut state = task.state();
    let mut results = task.results(false);
    let mut uncaught = host.uncaught_errors(false);

    let handle = task.start()?;
    assert_eq!(within(state.next()).await, Some(JobState::Idle));
    assert_eq!(within(state.next()).await, Some(JobState::Running));

    host.dispose();
    assert!(!host.is_active());
    assert!(handle.is_cancelled());
    assert_eq!(within(handle.join()).await?, ExitReason::Canceled);

    assert_eq!(within(state.next()).await, None);
    assert_eq!(within(results.next()).await, None);
    assert!(within(uncaught.next()).await.is_none());

    assert_eq!(
        task.start().err(),
        Some(RuntimeError::NotActive {
            host: "svc".to_string()
        })
    );
    Ok(())
}

#[tokio::test]
async fn disposed_host_can_be_started_again() -> anyhow::Result<()> {
    let host = host("again");
    host.start(None)?;
    host.dispose();
    host.dispose();

    host.start(None)?;
    let double = Task1::new(
        host.clone(),
        host.watch_context().name("double").build(),
        |n: u32, _token| async move { Ok(n * 2) },
    );
    let mut out = double.success_results(false);
    double.start(21)?.join().await?;
    assert_eq!(within(out.next()).await, Some(42));
    Ok(())
}

#[tokio::test]
async fn parent_cancellation_tears_down_like_dispose() -> anyhow::Result<()> {
    let parent = CancellationToken::new();
    let host = host("child");
    host.start(Some(&parent))?;

    let ctx = host.watch_context::<u32>().name("watched").build();
    let mut results = ctx.results(true);
    let mut uncaught = host.uncaught_errors(false);

    parent.cancel();
    assert!(!host.is_active());
    assert!(matches!(host.scope(), Err(RuntimeError::NotActive { .. })));

    assert_eq!(within(results.next()).await, None);
    assert!(within(uncaught.next()).await.is_none());

    host.start(None)?;
    assert!(host.is_active());
    Ok(())
}

#[tokio::test]
async fn launch_reports_failures_and_panics() -> anyhow::Result<()> {
    let host = host("bg");
    assert!(matches!(
        host.launch("early", |_t| async { Ok(()) }),
        Err(RuntimeError::NotActive { .. })
    ));
    host.start(None)?;
    let mut uncaught = host.uncaught_errors(false);

    host.launch("quiet", |_t| async { Ok(()) })?.await?;
    host.launch("flush", |_t| async { Err(JobError::fail("disk full")) })?
        .await?;
    host.launch("explode", |_t| async {
        let boom = true;
        if boom {
            panic!("bad state");
        }
        Ok(())
    })?
    .await?;

    let first = within(uncaught.next()).await.expect("flush failure");
    assert_eq!(first.origin.as_deref(), Some("flush"));
    assert_eq!(first.error, JobError::fail("disk full"));

    let second = within(uncaught.next()).await.expect("panic");
    assert_eq!(second.origin.as_deref(), Some("explode"));
    assert_eq!(
        second.error,
        JobError::Panicked {
            info: "bad state".to_string()
        }
    );
    assert!(second.seq > first.seq);
    Ok(())
}

#[tokio::test]
async fn cancelled_launch_is_not_reported() -> anyhow::Result<()> {
    let host = host("cancel-bg");
    host.start(None)?;
    let mut uncaught = host.uncaught_errors(true);

    let work = host.launch("waiter", |token| async move {
        token.cancelled().await;
        Err(JobError::fail("should not surface"))
    })?;
    host.dispose();
    within(work).await?;
    assert!(within(uncaught.next()).await.is_none());
    Ok(())
}

#[tokio::test]
async fn report_replays_latest_to_late_subscribers() -> anyhow::Result<()> {
    let host = host("reporter");
    host.report("manual", JobError::fail("first")).await;
    host.report("manual", JobError::fail("second")).await;

    let mut late = host.uncaught_errors(true);
    let ev = within(late.next()).await.expect("replayed failure");
    assert_eq!(ev.error, JobError::fail("second"));
    Ok(())
}

#[tokio::test]
async fn context_mapper_overrides_host_mapper() -> anyhow::Result<()> {
    let host = Host::builder(Config::default())
        .name("mapped")
        .error_mapper(|e| JobError::fail(format!("host: {}", e.as_message())))
        .build();
    host.start(None)?;

    let inherited = Task0::new(
        host.clone(),
        host.watch_context::<()>().name("inherited").build(),
        |_t| async { Err(JobError::fail("a")) },
    );
    let own = Task0::new(
        host.clone(),
        host.watch_context::<()>()
            .name("own")
            .error_mapper(|_| JobError::fail("own"))
            .build(),
        |_t| async { Err(JobError::fail("b")) },
    );
    let mut inherited_errors = inherited.errors(false);
    let mut own_errors = own.errors(false);

    assert_eq!(inherited.start()?.join().await?, ExitReason::Failed);
    assert_eq!(own.start()?.join().await?, ExitReason::Failed);

    assert_eq!(
        within(inherited_errors.next()).await,
        Some(JobError::fail("host: error: a"))
    );
    assert_eq!(within(own_errors.next()).await, Some(JobError::fail("own")));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn contexts_inherit_host_timeout() -> anyhow::Result<()> {
    let cfg = Config {
        timeout: Duration::from_secs(1),
        ..Config::default()
    };
    let host = Host::builder(cfg).name("slow").build();
    host.start(None)?;

    let stuck = Task0::new(host.clone(), host.watch_context::<()>().build(), |token| async move {
        token.cancelled().await;
        Ok(())
    });
    let mut errors = stuck.errors(false);

    assert_eq!(stuck.start()?.join().await?, ExitReason::Failed);
    assert_eq!(
        within(errors.next()).await,
        Some(JobError::Timeout {
            timeout: Duration::from_secs(1)
        })
    );
    assert_eq!(host.contexts(), vec!["slow-0".to_string()]);
    Ok(())
}
