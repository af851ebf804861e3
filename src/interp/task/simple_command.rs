//! Simple-Command Executor
//!
//! The central dispatcher. The task owns a deep copy of the command (the
//! run mutates its words during expansion), expands everything, builds the
//! argv fields, and dispatches: function, then builtin, then external
//! command. Built-ins run in the shell with saved descriptors unless the
//! command sits in a pipeline, where every stage forks.

use crate::ast::{Assignment, SimpleCommand};
use crate::builtins;
use crate::interp::expansion::{self, TildeMode};
use crate::interp::redirect::{self, SavedFds};
use crate::interp::task::{assignment, fork_subshell, task_for_command, Task, TaskImpl};
use crate::interp::{path, Context, TaskStatus};
use crate::shell::os;
use crate::shell::state::{Variable, VAR_ATTRIB_EXPORT, VAR_ATTRIB_NONE};

enum Kind {
    NotStarted,
    /// Bare-assignment command.
    Assignment(Task),
    /// Waiting on a forked child.
    Process(os::pid_t),
    /// Function body running in the shell, with the invocation's
    /// redirections saved aside.
    Function { task: Task, saved: Option<SavedFds> },
}

pub(crate) struct TaskSimpleCommand {
    sc: SimpleCommand,
    kind: Kind,
}

pub(crate) fn task_simple_command(sc: &SimpleCommand) -> Task {
    Task::new(Box::new(TaskSimpleCommand { sc: sc.clone(), kind: Kind::NotStarted }))
}

/// Open each redirection for its side effects only (file creation,
/// here-document drain), as a command with no name still does.
fn redirect_side_effects(ctx: &mut Context, sc: &SimpleCommand) -> Result<(), ()> {
    for redir in &sc.io_redirects {
        let source = redirect::process_redir(ctx, redir)?;
        if source.fd >= 0 && source.close_source {
            os::close(source.fd);
        }
    }
    Ok(())
}

/// Apply already-expanded assignments to the shell environment.
fn apply_assignments_persistent(ctx: &mut Context, assignments: &[Assignment]) -> Result<(), ()> {
    for assign in assignments {
        let attribs = if ctx.state.options.allexport {
            VAR_ATTRIB_EXPORT
        } else {
            VAR_ATTRIB_NONE
        };
        if ctx.state.env_set(&assign.name, &assign.value.str(), attribs).is_err() {
            eprintln!(
                "{}: cannot modify readonly variable {}",
                ctx.state.name(),
                assign.name
            );
            return Err(());
        }
    }
    Ok(())
}

/// Saved variable values for assignments scoped to one regular-builtin
/// invocation.
struct ScopedAssignments {
    saved: Vec<(String, Option<Variable>)>,
}

impl ScopedAssignments {
    fn apply(ctx: &mut Context, assignments: &[Assignment]) -> Result<ScopedAssignments, ()> {
        let mut scoped = ScopedAssignments { saved: Vec::new() };
        for assign in assignments {
            scoped
                .saved
                .push((assign.name.clone(), ctx.state.variables.get(&assign.name).cloned()));
        }
        if apply_assignments_persistent(ctx, assignments).is_err() {
            scoped.restore(ctx);
            return Err(());
        }
        Ok(scoped)
    }

    fn restore(self, ctx: &mut Context) {
        for (name, old) in self.saved.into_iter().rev() {
            match old {
                Some(var) => {
                    ctx.state.variables.insert(name, var);
                }
                None => {
                    ctx.state.variables.shift_remove(&name);
                }
            }
        }
    }
}

impl TaskSimpleCommand {
    /// Expand every word of the command in place and build the argv.
    fn expand(&mut self, ctx: &mut Context) -> Result<Vec<String>, TaskStatus> {
        let ifs = ctx.state.env_get_value("IFS").map(|s| s.to_string());

        let mut field_words = Vec::new();
        if let Some(name) = &mut self.sc.name {
            expansion::expand_word_in_place(ctx, name, TildeMode::Name)?;
            field_words.extend(expansion::field_split::split_fields(name, ifs.as_deref()));
        }
        for arg in &mut self.sc.arguments {
            expansion::expand_word_in_place(ctx, arg, TildeMode::Name)?;
            field_words.extend(expansion::field_split::split_fields(arg, ifs.as_deref()));
        }

        for assign in &mut self.sc.assignments {
            expansion::expand_word_in_place(ctx, &mut assign.value, TildeMode::Assignment)?;
        }

        for redir in &mut self.sc.io_redirects {
            expansion::expand_word_in_place(ctx, &mut redir.name, TildeMode::Name)?;
            for line in &mut redir.here_document {
                expansion::expand_word_in_place(ctx, line, TildeMode::None)?;
            }
        }

        let args = if ctx.state.options.noglob {
            field_words.iter().map(|field| field.str()).collect()
        } else {
            expansion::pathname::expand_pathnames(&field_words)
        };
        Ok(args)
    }

    fn start(&mut self, ctx: &mut Context) -> TaskStatus {
        ctx.last_cmdsubst_status = None;

        if self.sc.name.is_none() {
            for redir in &mut self.sc.io_redirects {
                if expansion::expand_word_in_place(ctx, &mut redir.name, TildeMode::Name)
                    .is_err()
                {
                    return TaskStatus::Error;
                }
                for line in &mut redir.here_document {
                    if expansion::expand_word_in_place(ctx, line, TildeMode::None).is_err()
                    {
                        return TaskStatus::Error;
                    }
                }
            }
            if redirect_side_effects(ctx, &self.sc).is_err() {
                return TaskStatus::Exit(1);
            }
            self.kind = Kind::Assignment(assignment::task_assignment(&self.sc.assignments));
            return TaskStatus::Wait;
        }

        let args = match self.expand(ctx) {
            Ok(args) => args,
            Err(status) => return status,
        };

        // The name may expand to nothing; assignments still apply.
        if args.is_empty() {
            if apply_assignments_persistent(ctx, &self.sc.assignments).is_err() {
                return TaskStatus::Error;
            }
            if redirect_side_effects(ctx, &self.sc).is_err() {
                return TaskStatus::Exit(1);
            }
            return TaskStatus::Exit(ctx.last_cmdsubst_status.unwrap_or(0));
        }

        if ctx.state.options.xtrace {
            let ps4 = expansion::expand_ps(ctx.state, "PS4", "+ ");
            eprintln!("{}{}", ps4, args.join(" "));
        }

        if ctx.state.functions.contains_key(&args[0]) {
            return self.start_function(ctx, args);
        }
        if builtins::has_builtin(&args[0]) {
            return self.start_builtin(ctx, args);
        }
        self.start_process(ctx, args)
    }

    fn start_function(&mut self, ctx: &mut Context, args: Vec<String>) -> TaskStatus {
        // Assignments preceding a function call persist, as they do for
        // special builtins.
        if apply_assignments_persistent(ctx, &self.sc.assignments).is_err() {
            return TaskStatus::Error;
        }

        let mut saved = SavedFds::new();
        for redir in &self.sc.io_redirects {
            if saved.apply(ctx, redir).is_err() {
                saved.restore();
                return TaskStatus::Exit(1);
            }
        }

        // The function may be redefined or unset while it runs; take an
        // owned copy of the body.
        let body = ctx.state.functions.get(&args[0]).expect("function exists").body.clone();
        ctx.state.push_frame(args);
        self.kind =
            Kind::Function { task: task_for_command(&body), saved: Some(saved) };
        TaskStatus::Wait
    }

    fn start_builtin(&mut self, ctx: &mut Context, args: Vec<String>) -> TaskStatus {
        let special = builtins::has_special_builtin(&args[0]);

        // Inside a pipeline the stage forks even for a builtin, so the
        // shell never blocks on its own pipe ends.
        if ctx.stdin_fileno >= 0 || ctx.stdout_fileno >= 0 {
            return self.start_forked_builtin(ctx, args);
        }

        let scoped = if special {
            if apply_assignments_persistent(ctx, &self.sc.assignments).is_err() {
                return TaskStatus::Error;
            }
            None
        } else {
            match ScopedAssignments::apply(ctx, &self.sc.assignments) {
                Ok(scoped) => Some(scoped),
                Err(()) => return TaskStatus::Error,
            }
        };

        let mut saved = SavedFds::new();
        for redir in &self.sc.io_redirects {
            if saved.apply(ctx, redir).is_err() {
                saved.restore();
                if let Some(scoped) = scoped {
                    scoped.restore(ctx);
                }
                return TaskStatus::Exit(1);
            }
        }

        ctx.persist_redirects = false;
        let ret = builtins::run_builtin(ctx, &args);

        // Flush before restoring so pipe readers see ordered output.
        if ctx.persist_redirects {
            ctx.persist_redirects = false;
            saved.commit();
        } else {
            saved.restore();
        }
        if let Some(scoped) = scoped {
            scoped.restore(ctx);
        }

        if ret == TaskStatus::Error && special && !ctx.state.interactive {
            ctx.state.exit = Some(1);
        }
        ret
    }

    fn start_forked_builtin(&mut self, ctx: &mut Context, args: Vec<String>) -> TaskStatus {
        let pid = match fork_subshell(ctx) {
            Ok(pid) => pid,
            Err(err) => {
                eprintln!("{}: fork: {}", ctx.state.name(), err);
                return TaskStatus::Error;
            }
        };

        if pid == 0 {
            if apply_assignments_persistent(ctx, &self.sc.assignments).is_err() {
                std::process::exit(1);
            }
            for redir in &self.sc.io_redirects {
                let source = match redirect::process_redir(ctx, redir) {
                    Ok(source) => source,
                    Err(()) => std::process::exit(1),
                };
                if redirect::apply_redir_child(&source).is_err() {
                    eprintln!("{}: cannot duplicate file descriptor", ctx.state.name());
                    std::process::exit(1);
                }
            }

            let ret = builtins::run_builtin(ctx, &args);
            os::flush_stdio();
            let code = ctx.state.exit.unwrap_or(match ret {
                TaskStatus::Exit(code) => code,
                TaskStatus::Interrupted => ctx.state.last_status,
                _ => 1,
            });
            std::process::exit(code);
        }

        self.register_child(ctx, pid);
        TaskStatus::Wait
    }

    fn start_process(&mut self, ctx: &mut Context, args: Vec<String>) -> TaskStatus {
        let Some(exec_path) = path::expand_path(ctx.state, &args[0], true) else {
            eprintln!("{}: {}: not found", ctx.state.name(), args[0]);
            return TaskStatus::Exit(127);
        };

        let pid = match fork_subshell(ctx) {
            Ok(pid) => pid,
            Err(err) => {
                eprintln!("{}: fork: {}", ctx.state.name(), err);
                return TaskStatus::Error;
            }
        };

        if pid == 0 {
            // Per-command environment: assignments, then exported
            // variables.
            for assign in &self.sc.assignments {
                if ctx.state.is_readonly(&assign.name) {
                    eprintln!(
                        "{}: cannot modify readonly variable {}",
                        ctx.state.name(),
                        assign.name
                    );
                    std::process::exit(1);
                }
                os::setenv(&assign.name, &assign.value.str());
            }
            for (name, var) in &ctx.state.variables {
                if var.attribs & VAR_ATTRIB_EXPORT != 0 {
                    os::setenv(name, &var.value);
                }
            }

            for redir in &self.sc.io_redirects {
                let source = match redirect::process_redir(ctx, redir) {
                    Ok(source) => source,
                    Err(()) => std::process::exit(1),
                };
                if let Err(err) = redirect::apply_redir_child(&source) {
                    eprintln!(
                        "{}: cannot duplicate file descriptor: {}",
                        ctx.state.name(),
                        err
                    );
                    std::process::exit(1);
                }
            }

            let err = os::execv(&exec_path, &args);
            eprintln!("{}: {}: {}", ctx.state.name(), args[0], err);
            let code = if err.raw_os_error() == Some(libc::ENOENT) { 127 } else { 126 };
            std::process::exit(code);
        }

        self.register_child(ctx, pid);
        TaskStatus::Wait
    }

    fn register_child(&mut self, ctx: &mut Context, pid: os::pid_t) {
        match ctx.job {
            Some(job_id) => {
                ctx.state.job_add_process(job_id, pid);
                if ctx.state.options.monitor
                    && ctx.state.interactive
                    && !ctx.background
                {
                    ctx.state.job_set_foreground(job_id, true, false);
                }
            }
            None => ctx.state.process_create(pid),
        }
        self.kind = Kind::Process(pid);
    }
}

impl TaskImpl for TaskSimpleCommand {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if matches!(self.kind, Kind::NotStarted) {
            let ret = self.start(ctx);
            if ret != TaskStatus::Wait {
                return ret;
            }
        }

        match &mut self.kind {
            Kind::NotStarted => unreachable!(),
            Kind::Assignment(task) => task.poll(ctx),
            Kind::Process(pid) => ctx.state.process_poll(*pid),
            Kind::Function { task, saved } => {
                let ret = task.poll(ctx);
                if ret == TaskStatus::Wait {
                    return TaskStatus::Wait;
                }

                ctx.state.pop_frame();
                if let Some(saved) = saved.take() {
                    saved.restore();
                }

                match ret {
                    // `return` (and any stray break/continue) stops at the
                    // function boundary; the branch died with the frame.
                    TaskStatus::Interrupted => TaskStatus::Exit(ctx.state.last_status),
                    other => other,
                }
            }
        }
    }
}
