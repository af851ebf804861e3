//! Binop task: `&&` runs the right side iff the left succeeded, `||` iff it
//! failed. The left side is a condition context for errexit purposes.

use crate::ast::{Binop, BinopKind};
use crate::interp::task::{task_for_node, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};

struct TaskBinop {
    kind: BinopKind,
    left: Task,
    right: Task,
}

pub(crate) fn task_binop(binop: &Binop) -> Task {
    Task::new(Box::new(TaskBinop {
        kind: binop.kind,
        left: task_for_node(&binop.left),
        right: task_for_node(&binop.right),
    }))
}

impl TaskImpl for TaskBinop {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        ctx.state.condition_depth += 1;
        let left_status = self.left.poll(ctx);
        ctx.state.condition_depth -= 1;

        let left_code = match left_status {
            TaskStatus::Exit(code) => code,
            other => return other,
        };

        match self.kind {
            BinopKind::And => {
                if left_code != 0 {
                    return TaskStatus::Exit(left_code);
                }
            }
            BinopKind::Or => {
                if left_code == 0 {
                    return TaskStatus::Exit(0);
                }
            }
        }

        self.right.poll(ctx)
    }
}
