use crate::domain::config::AssistantConfig;
use crate::domain::ids::{short_id, TASK_ID_PREFIX};
use crate::domain::types::Task;

const NO_TASKS_LINE: &str = "- (no tasks yet; do not invent task ids)";

/// Assembles the system prompt. Pure: same inputs, same bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, config: &AssistantConfig, tasks: &[Task]) -> String {
        let config = config.normalized();
        let mut prompt = String::new();

        prompt.push_str("You are an AI assistant that helps the user manage the tasks of one project.\n");
        prompt.push_str(&format!("Style: {}\n", config.chat_style));
        prompt.push_str(&format!("Expertise: {}\n", config.domain_knowledge.join(", ")));
        prompt.push_str(&format!("Reply language: {}\n\n", config.language));

        prompt.push_str("## Current tasks\n");
        if tasks.is_empty() {
            prompt.push_str(NO_TASKS_LINE);
            prompt.push('\n');
        } else {
            for task in tasks {
                prompt.push_str(&task_line(task));
                prompt.push('\n');
            }
        }

        prompt.push_str(PROTOCOL);
        prompt
    }
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "- [{}] {} (status: {}, priority: {})",
        short_id(task.id, TASK_ID_PREFIX),
        task.name,
        task.status.as_str(),
        task.priority.as_str()
    );
    if let Some(description) = task.description.as_deref().filter(|text| !text.is_empty()) {
        line.push_str(&format!(" - {description}"));
    }
    if let Some(start) = &task.start_datetime {
        line.push_str(&format!(" start: {start}"));
    }
    if let Some(end) = &task.end_datetime {
        line.push_str(&format!(" end: {end}"));
    }
    line
}

const PROTOCOL: &str = r#"
## Response protocol
To change or inspect tasks, answer with exactly one JSON object and nothing else.
The confirmation shown to the user is generated from the result, so actions carry no "message".

### Create a task
```json
{"action": "create_task", "arguments": {"name": "task name", "description": "optional", "priority": "low|medium|high", "start_datetime": "2024-01-15T09:00:00Z (optional)", "end_datetime": "2024-01-15T17:00:00Z (optional)", "location": "optional"}}
```

### Update a task
```json
{"action": "update_task", "arguments": {"task_id": "tsk_xxx", "name": "new name", "description": "optional", "priority": "low|medium|high"}}
```

### Delete a task
```json
{"action": "delete_task", "arguments": {"task_id": "tsk_xxx"}}
```

### Show one task
```json
{"action": "get_task", "arguments": {"task_id": "tsk_xxx"}}
```

### List tasks
```json
{"action": "list_tasks", "arguments": {"status": "todo|in_progress|review|done (optional)"}}
```

### Reply with text only
```json
{"type": "text", "message": "your answer"}
```

### Suggest tasks without saving them
```json
{"type": "task_list", "message": "short summary", "tasks": [{"name": "task name", "priority": "medium"}]}
```

## Rules
1. When the user wants to manage tasks, reply with the JSON object only.
2. For questions or advice, reply in plain text or with the text object above.
3. priority must be one of: low, medium, high.
4. Datetimes must be RFC 3339, for example 2024-01-15T09:00:00Z.
5. Only use task ids from the current task list above.
"#;
