//! Plan command implementation

use anyhow::Result;
use lanework::{ExecutorConfig, partition};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
struct LanePlan {
    lane: usize,
    items: Vec<String>,
}

pub fn run(lanes: usize, json: bool, items: Vec<String>) -> Result<()> {
    let plan = build(lanes, items)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render(&plan));
    }
    Ok(())
}

fn build(lanes: usize, items: Vec<String>) -> Result<Vec<LanePlan>> {
    let config = ExecutorConfig::new(lanes)?;
    Ok(partition(items, config.lane_count)
        .into_iter()
        .map(|lane| LanePlan {
            lane: lane.index(),
            items: lane.into_items(),
        })
        .collect())
}

fn render(plan: &[LanePlan]) -> String {
    plan.iter()
        .map(|lane| format!("lane {}: {}\n", lane.lane, lane.items.join(" ")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{build, render};

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_round_robin() {
        let plan = build(2, items(&["a", "b", "c", "d", "e"])).unwrap();
        assert_eq!(render(&plan), "lane 0: a c e\nlane 1: b d\n");
    }

    #[test]
    fn test_plan_empty_lanes() {
        let plan = build(3, items(&["a"])).unwrap();
        assert_eq!(render(&plan), "lane 0: a\nlane 1: \nlane 2: \n");
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json[0]["items"][0], "a");
    }

    #[test]
    fn test_plan_rejects_zero_lanes() {
        let err = build(0, items(&["a"])).unwrap_err();
        assert!(err.to_string().contains("lane_count"));
    }
}
