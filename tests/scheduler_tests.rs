// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Scheduler behavior across composed pipelines

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::sync::Barrier;

use watermill::pipeline::RunObserver;
use watermill::task::{Task, TaskResult};
use watermill::{fork, join, junction, task, Command, Context, Node, NodeResult, Scheduler, TaskDescriptor, WatermillError};

/// Records "start:name" and "end:name" events in arrival order
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("no event {}", event))
    }
}

impl RunObserver for Recorder {
    fn task_started(&self, task: &Task, _workspace: &Path) {
        self.events.lock().unwrap().push(format!("start:{}", task.name()));
    }

    fn task_finished(&self, task: &Task, _outcome: Result<&TaskResult, &WatermillError>) {
        self.events.lock().unwrap().push(format!("end:{}", task.name()));
    }
}

fn recording() -> (Scheduler, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    (Scheduler::default().with_observer(recorder.clone()), recorder)
}

fn shell(descriptor: TaskDescriptor, command: &str) -> Node {
    let command = command.to_string();
    task(descriptor, move |_: &Context| command.clone()).unwrap()
}

/// Action that only completes once `barrier` is reached by all parties
fn rendezvous(descriptor: TaskDescriptor, barrier: Arc<Barrier>, writes: Option<&'static str>) -> Node {
    task(descriptor, move |ctx: &Context| {
        let barrier = barrier.clone();
        let target = writes.map(|w| ctx.dir.join(w));
        Command::action(async move {
            tokio::time::timeout(Duration::from_secs(5), barrier.wait()).await?;
            if let Some(target) = target {
                tokio::fs::write(target, "done").await?;
            }
            Ok(())
        })
    })
    .unwrap()
}

#[tokio::test]
async fn test_join_finishes_producer_before_consumer_resolves() {
    let tmp = TempDir::new().unwrap();
    let producer = shell(
        TaskDescriptor::new("produce").output("*.txt"),
        "sleep 0.2 && echo hello > greeting.txt",
    );
    let consumer = shell(TaskDescriptor::new("consume").input("*.txt"), "cat greeting.txt");

    let (scheduler, recorder) = recording();
    let result = scheduler.run(&join([producer, consumer]).unwrap(), tmp.path()).await.unwrap();

    assert_eq!(
        recorder.events(),
        vec!["start:produce", "end:produce", "start:consume", "end:consume"]
    );
    let consumed = result.as_task().unwrap();
    assert!(consumed.stdout.contains("hello"));
    assert_eq!(consumed.input.as_ref().unwrap().paths().len(), 1);
}

#[tokio::test]
async fn test_fork_starts_every_branch_before_awaiting() {
    let tmp = TempDir::new().unwrap();
    let barrier = Arc::new(Barrier::new(3));

    // Each branch blocks until all three are running
    let node = fork([
        rendezvous(TaskDescriptor::new("b1"), barrier.clone(), None),
        rendezvous(TaskDescriptor::new("b2"), barrier.clone(), None),
        rendezvous(TaskDescriptor::new("b3"), barrier.clone(), None),
    ])
    .unwrap();

    let result = Scheduler::default().run(&node, tmp.path()).await.unwrap();

    let names: Vec<_> = result.tasks().iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["b1", "b2", "b3"]);
}

#[tokio::test]
async fn test_join_then_fork_scenario() {
    let tmp = TempDir::new().unwrap();
    let node = join([
        shell(TaskDescriptor::new("taskA").output("a.out"), "touch a.out"),
        fork([
            shell(TaskDescriptor::new("taskB").input("a.out"), "sleep 0.2; echo B"),
            shell(TaskDescriptor::new("taskC").input("a.out"), "echo C"),
        ])
        .unwrap(),
    ])
    .unwrap();

    let (scheduler, recorder) = recording();
    let result = scheduler.run(&node, tmp.path()).await.unwrap();

    let NodeResult::Fork(ref branches) = result else {
        panic!("Expected the fork's result, got {:?}", result);
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].as_task().unwrap().stdout.trim(), "B");
    assert_eq!(branches[1].as_task().unwrap().stdout.trim(), "C");

    let a_done = recorder.position("end:taskA");
    assert!(a_done < recorder.position("start:taskB"));
    assert!(a_done < recorder.position("start:taskC"));
}

#[tokio::test]
async fn test_junction_is_awaited_before_successor() {
    let tmp = TempDir::new().unwrap();
    let barrier = Arc::new(Barrier::new(2));

    // rootX and rootY meet at the barrier, so they must overlap
    let node = join([
        junction([
            rendezvous(TaskDescriptor::new("rootX").output("x.out"), barrier.clone(), Some("x.out")),
            join([
                rendezvous(TaskDescriptor::new("rootY").output("y.mid"), barrier.clone(), Some("y.mid")),
                shell(
                    TaskDescriptor::new("stepZ").input("y.mid").output("z.out"),
                    "sleep 0.2 && cp y.mid z.out",
                ),
            ])
            .unwrap(),
        ])
        .unwrap(),
        shell(
            TaskDescriptor::new("stepW").input(watermill::Patterns::named([("x", "x.out"), ("z", "z.out")])),
            "cat x.out z.out",
        ),
    ])
    .unwrap();

    let (scheduler, recorder) = recording();
    let result = scheduler.run(&node, tmp.path()).await.unwrap();

    let w_start = recorder.position("start:stepW");
    assert!(recorder.position("end:rootX") < w_start);
    assert!(recorder.position("end:stepZ") < w_start);
    assert_eq!(result.as_task().unwrap().stdout, "donedone");
}

#[tokio::test]
async fn test_missing_output_fails_despite_exit_zero() {
    let tmp = TempDir::new().unwrap();
    let node = shell(TaskDescriptor::new("mapper").output("*.sam"), "echo 'wrote nothing'");

    let err = Scheduler::default().run(&node, tmp.path()).await.unwrap_err();

    assert_eq!(err.kind(), "OutputNotFoundError");
    assert_eq!(err.task(), Some("mapper"));
}

#[tokio::test]
async fn test_missing_input_never_invokes_command() {
    let tmp = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let node = task(TaskDescriptor::new("index").input("*.fa"), move |_: &Context| {
        counter.fetch_add(1, Ordering::SeqCst);
        "true"
    })
    .unwrap();

    let err = Scheduler::default().run(&node, tmp.path()).await.unwrap_err();

    assert_eq!(err.kind(), "InputResolutionError");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rerun_executes_everything_again() {
    let tmp = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counted = |name: &str, cmd: &'static str, calls: Arc<AtomicUsize>| {
        task(TaskDescriptor::new(name).output("*.out"), move |_: &Context| {
            calls.fetch_add(1, Ordering::SeqCst);
            cmd
        })
        .unwrap()
    };
    let node = join([
        counted("first", "echo 1 > first.out", calls.clone()),
        counted("second", "echo 2 > second.out", calls.clone()),
    ])
    .unwrap();

    let scheduler = Scheduler::default();
    let first = scheduler.run(&node, tmp.path()).await.unwrap();
    let second = scheduler.run(&node, tmp.path()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(first.outputs(), second.outputs());
}

#[tokio::test]
async fn test_fork_failure_stops_new_launches() {
    let tmp = TempDir::new().unwrap();
    let node = fork([
        shell(TaskDescriptor::new("broken"), "echo boom >&2; exit 3"),
        join([
            shell(TaskDescriptor::new("slow"), "sleep 0.5"),
            shell(TaskDescriptor::new("after-slow"), "touch never-ran"),
        ])
        .unwrap(),
    ])
    .unwrap();

    let start = Instant::now();
    let err = Scheduler::default().run(&node, tmp.path()).await.unwrap_err();

    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(err.kind(), "CommandExecutionError");
    assert_eq!(err.task(), Some("broken"));
    assert!(err.stderr().unwrap().contains("boom"));

    // The detached branch finishes its process but launches nothing else
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!tmp.path().join("never-ran").exists());
}

#[tokio::test]
async fn test_dir_override_is_inherited_by_successor() {
    let tmp = TempDir::new().unwrap();
    let node = join([
        shell(TaskDescriptor::new("prepare").dir("mapping").output("ref.fa"), "touch ref.fa"),
        shell(TaskDescriptor::new("index").input("ref.fa"), "pwd"),
    ])
    .unwrap();

    let result = Scheduler::default().run(&node, tmp.path()).await.unwrap();

    let index = result.as_task().unwrap();
    assert!(index.dir.ends_with("mapping"));
    assert!(tmp.path().join("mapping/ref.fa").exists());
}

#[tokio::test]
async fn test_missing_shell_is_task_failure() {
    let tmp = TempDir::new().unwrap();
    let scheduler = Scheduler::new(Arc::new(watermill::executors::ShellExecutor::with_shell(
        "no-such-shell-xyz",
    )));
    let node = shell(TaskDescriptor::new("bwa-index"), "bwa index ref.fa");

    let err = scheduler.run(&node, tmp.path()).await.unwrap_err();

    assert_eq!(err.kind(), "CommandExecutionError");
    assert_eq!(err.task(), Some("bwa-index"));
}

#[tokio::test]
async fn test_bracketed_workspace_name() {
    let tmp = TempDir::new().unwrap();
    let workspace = tmp.path().join("run[1]");
    let node = join([
        shell(TaskDescriptor::new("produce").output("*.txt"), "echo hi > a.txt"),
        shell(TaskDescriptor::new("consume").input("*.txt"), "cat a.txt"),
    ])
    .unwrap();

    let result = Scheduler::default().run(&node, &workspace).await.unwrap();

    let consumed = result.as_task().unwrap();
    assert_eq!(consumed.stdout.trim(), "hi");
    assert!(consumed.input.as_ref().unwrap().paths()[0].ends_with("run[1]/a.txt"));
}
