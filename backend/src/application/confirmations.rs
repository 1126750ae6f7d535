use crate::domain::chat::{FunctionResult, CREATE_TASK, DELETE_TASK, GET_TASK, LIST_TASKS, UPDATE_TASK};
use serde_json::Value;

/// Turns an executed action into the message shown to the user.
pub fn render(thai: bool, action: &str, result: &FunctionResult) -> String {
    if !result.success {
        let error = result.error.as_deref().unwrap_or("unknown error");
        return if thai {
            format!("ขออภัย ไม่สามารถดำเนินการได้: {error}")
        } else {
            format!("Sorry, I could not complete that: {error}")
        };
    }

    let data = &result.data;
    let name = text(data, "name");
    match action {
        CREATE_TASK => match thai {
            true => format!("สร้าง task \"{name}\" เรียบร้อยแล้ว ✅"),
            false => format!("Created task \"{name}\" ✅"),
        },
        UPDATE_TASK => match thai {
            true => format!("อัพเดท task \"{name}\" เรียบร้อยแล้ว ✅"),
            false => format!("Updated task \"{name}\" ✅"),
        },
        DELETE_TASK => match thai {
            true => format!("ลบ task \"{name}\" เรียบร้อยแล้ว ✅"),
            false => format!("Deleted task \"{name}\" ✅"),
        },
        GET_TASK => task_details(thai, data),
        LIST_TASKS => task_list(thai, data),
        _ if thai => "ดำเนินการเรียบร้อยแล้ว ✅".to_string(),
        _ => "Done ✅".to_string(),
    }
}

fn task_details(thai: bool, task: &Value) -> String {
    let labels = if thai {
        ["📋 รายละเอียด Task:", "ชื่อ", "สถานะ", "Priority", "รายละเอียด", "เริ่ม", "สิ้นสุด", "สถานที่"]
    } else {
        ["📋 Task details:", "Name", "Status", "Priority", "Description", "Start", "End", "Location"]
    };

    let mut out = format!("{}\n", labels[0]);
    out.push_str(&format!("- {}: {}\n", labels[1], text(task, "name")));
    out.push_str(&format!("- {}: {}\n", labels[2], text(task, "status")));
    out.push_str(&format!("- {}: {}\n", labels[3], text(task, "priority")));
    for (label, key) in [
        (labels[4], "description"),
        (labels[5], "start_datetime"),
        (labels[6], "end_datetime"),
        (labels[7], "location"),
    ] {
        if let Some(value) = task.get(key).and_then(Value::as_str) {
            out.push_str(&format!("- {label}: {value}\n"));
        }
    }
    out
}

fn task_list(thai: bool, data: &Value) -> String {
    let tasks = data
        .get("tasks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if tasks.is_empty() {
        return if thai {
            "📋 ไม่มี task ใน project นี้".to_string()
        } else {
            "📋 There are no tasks in this project".to_string()
        };
    }

    let (header, status_label) = if thai {
        ("📋 รายการ Tasks:", "สถานะ")
    } else {
        ("📋 Tasks:", "Status")
    };
    let mut out = format!("{header}\n");
    for (index, task) in tasks.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, text(task, "name")));
        out.push_str(&format!(
            "   {status_label}: {} | Priority: {}\n",
            text(task, "status"),
            text(task, "priority")
        ));
    }
    out
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_is_numbered_past_nine() {
        let tasks: Vec<Value> = (0..11)
            .map(|i| json!({"name": format!("t{i}"), "status": "todo", "priority": "low"}))
            .collect();
        let rendered = render(false, LIST_TASKS, &FunctionResult::ok(json!({"tasks": tasks, "count": 11})));
        assert!(rendered.contains("11. t10"));
    }

    #[test]
    fn failure_message_carries_error_in_both_languages() {
        let failed = FunctionResult::failed("task not found");
        assert_eq!(
            render(false, DELETE_TASK, &failed),
            "Sorry, I could not complete that: task not found"
        );
        assert!(render(true, DELETE_TASK, &failed).ends_with("task not found"));
    }
}
