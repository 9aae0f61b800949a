use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use jobwatch::{
    ExitReason, JobError, JobState, JobStream, JobStreamExt, RuntimeError, StartPolicy, Task0,
    Task1, Task2, Task3, WatchContext,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation timed out")
}

#[tokio::test]
async fn no_arg_task_emits_its_value_once() -> anyhow::Result<()> {
    let task = Task0::new(
        CancellationToken::new(),
        WatchContext::named("hello"),
        |_token| async { Ok("hello".to_string()) },
    );
    let mut out = task.success_results(false);

    assert_eq!(task.start()?.join().await?, ExitReason::Succeeded);
    assert_eq!(within(out.next()).await, Some("hello".to_string()));
    assert!(out.next().now_or_never().is_none());
    Ok(())
}

#[tokio::test]
async fn failure_is_observed_once() -> anyhow::Result<()> {
    let task = Task0::new(
        CancellationToken::new(),
        WatchContext::<()>::named("fails"),
        |_token| async { Err(JobError::fail("hello")) },
    );
    let mut errors = task.errors(false);
    let mut values = task.success_results(false);

    assert_eq!(task.start()?.join().await?, ExitReason::Failed);
    assert_eq!(within(errors.next()).await, Some(JobError::fail("hello")));
    assert!(errors.next().now_or_never().is_none());
    assert!(values.next().now_or_never().is_none());
    Ok(())
}

#[tokio::test]
async fn identical_results_are_delivered_each_time() -> anyhow::Result<()> {
    let echo = Task1::new(
        CancellationToken::new(),
        WatchContext::named("echo"),
        |n: u32, _token| async move { Ok(n) },
    );
    let mut out = echo.success_results(true);

    echo.start(33)?.join().await?;
    echo.start(33)?.join().await?;

    let got: Vec<u32> = within(out.by_ref().take(2).collect()).await;
    assert_eq!(got, vec![33, 33]);
    assert!(out.next().now_or_never().is_none());
    Ok(())
}

#[tokio::test]
async fn arguments_are_forwarded_in_order() -> anyhow::Result<()> {
    let scope = CancellationToken::new();
    let join = Task2::new(
        scope.clone(),
        WatchContext::named("join"),
        |a: String, b: u8, _token| async move { Ok(format!("{a}:{b}")) },
    );
    let sum = Task3::new(
        scope,
        WatchContext::named("sum"),
        |a: i64, b: i64, c: i64, _token| async move { Ok(a + b + c) },
    );
    let mut joined = join.success_results(false);
    let mut summed = sum.success_results(false);

    join.start("x".to_string(), 7)?.join().await?;
    sum.start(1, -2, 40)?.join().await?;

    assert_eq!(within(joined.next()).await, Some("x:7".to_string()));
    assert_eq!(within(summed.next()).await, Some(39));
    Ok(())
}

#[tokio::test]
async fn tasks_sharing_a_context_share_its_flight_slot() -> anyhow::Result<()> {
    let scope = CancellationToken::new();
    let ctx = WatchContext::<u32>::named("shared");
    let release = Arc::new(Notify::new());

    let slow = {
        let release = Arc::clone(&release);
        Task0::new(scope.clone(), ctx.clone(), move |_token| {
            let release = release.clone();
            async move {
                release.notified().await;
                Ok(1)
            }
        })
    };
    let fast = Task1::new(scope, ctx.clone(), |n: u32, _token| async move { Ok(n) });
    let mut state = fast.state();

    let running = slow.start()?;
    assert_eq!(within(state.next()).await, Some(JobState::Idle));
    assert_eq!(within(state.next()).await, Some(JobState::Running));
    assert_eq!(
        fast.start(2).err(),
        Some(RuntimeError::AlreadyRunning {
            context: "shared".to_string()
        })
    );

    release.notify_one();
    within(running.join()).await?;
    assert_eq!(fast.current_state(), JobState::Idle);
    assert_eq!(ctx.last_result(), Some(Ok(1)));
    Ok(())
}

#[tokio::test]
async fn lazy_task_waits_for_an_observer() -> anyhow::Result<()> {
    let task = Task0::new(
        CancellationToken::new(),
        WatchContext::named("lazy-task"),
        |_token| async { Ok(11u8) },
    );

    let handle = task.start_with(StartPolicy::lazily(1, 0)?)?;
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());

    let mut state = task.state();
    let seen: Vec<JobState> = within(state.by_ref().take(3).collect()).await;
    assert_eq!(seen, vec![JobState::Idle, JobState::Running, JobState::Idle]);
    assert_eq!(within(handle.join()).await?, ExitReason::Succeeded);
    assert_eq!(task.context().last_result(), Some(Ok(11)));
    Ok(())
}

#[tokio::test]
async fn mapped_views_transform_results() -> anyhow::Result<()> {
    let parse = Task1::new(
        CancellationToken::new(),
        WatchContext::named("parse"),
        |raw: &'static str, _token| async move { raw.parse::<u32>().map_err(JobError::fail) },
    );
    let view = parse
        .clone()
        .map_success_results(|v: u32| async move { v * 10 })
        .map_errors(|e: JobError| async move {
            JobError::fail(format!("parse: {}", e.as_message()))
        });
    let mut results = view.results(false);

    parse.start("4")?.join().await?;
    parse.start("x")?.join().await?;

    assert_eq!(within(results.next()).await, Some(Ok(40)));
    let err = within(results.next()).await;
    assert!(matches!(
        err,
        Some(Err(JobError::Fail { ref error })) if error.starts_with("parse: error: ")
    ));
    Ok(())
}

#[tokio::test]
async fn cancelled_scope_cancels_every_run() -> anyhow::Result<()> {
    let scope = CancellationToken::new();
    let task = Task0::new(scope.clone(), WatchContext::<()>::named("doomed"), |token| async move {
        token.cancelled().await;
        Err(JobError::Canceled)
    });
    let mut results = task.results(false);

    let handle = task.start()?;
    scope.cancel();
    assert_eq!(within(handle.join()).await?, ExitReason::Canceled);
    assert!(results.next().now_or_never().is_none());
    Ok(())
}

#[tokio::test]
async fn cancelled_token_scope_keeps_streams_open() -> anyhow::Result<()> {
    let scope = CancellationToken::new();
    let ctx = WatchContext::<u32>::named("bare-scope");
    let task = Task0::new(scope.clone(), ctx.clone(), |token| async move {
        token.cancelled().await;
        Ok(0)
    });
    let mut state = task.state();
    let mut results = task.results(false);

    let handle = task.start()?;
    scope.cancel();
    assert_eq!(within(handle.join()).await?, ExitReason::Canceled);

    let seen: Vec<JobState> = within(state.by_ref().take(3).collect()).await;
    assert_eq!(seen, vec![JobState::Idle, JobState::Running, JobState::Idle]);
    assert!(state.next().now_or_never().is_none());
    assert!(results.next().now_or_never().is_none());

    ctx.disconnect();
    assert_eq!(within(state.next()).await, None);
    assert_eq!(within(results.next()).await, None);
    Ok(())
}
