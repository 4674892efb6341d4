//! Scripted tasks of the synthetic scene.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::SimError;

/// A tabletop task with a scripted demonstration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    ReachTarget,
    PickUpCup,
    PutIntoDrawer,
    StackBlocks,
    OpenDoor,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::ReachTarget,
        TaskKind::PickUpCup,
        TaskKind::PutIntoDrawer,
        TaskKind::StackBlocks,
        TaskKind::OpenDoor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::ReachTarget => "ReachTarget",
            TaskKind::PickUpCup => "PickUpCup",
            TaskKind::PutIntoDrawer => "PutIntoDrawer",
            TaskKind::StackBlocks => "StackBlocks",
            TaskKind::OpenDoor => "OpenDoor",
        }
    }

    pub fn descriptions(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            TaskKind::ReachTarget => &[
                "reach the red target",
                "touch the red ball with the panda gripper",
                "reach the red sphere",
            ],
            TaskKind::PickUpCup => &["pick up the blue cup", "lift the blue cup off the table"],
            TaskKind::PutIntoDrawer => &[
                "put the item in the drawer",
                "place the green block into the open drawer",
            ],
            TaskKind::StackBlocks => &["stack the yellow block", "place one block on top of another"],
            TaskKind::OpenDoor => &["open the door", "pull the door handle open"],
        };
        lines.iter().map(|s| s.to_string()).collect()
    }

    /// Colour of the task object.
    pub fn object_color(&self) -> [u8; 3] {
        match self {
            TaskKind::ReachTarget => [220, 40, 40],
            TaskKind::PickUpCup => [40, 80, 220],
            TaskKind::PutIntoDrawer => [40, 180, 70],
            TaskKind::StackBlocks => [230, 200, 40],
            TaskKind::OpenDoor => [150, 90, 50],
        }
    }

    /// Radius of the task object in metres.
    pub fn object_radius(&self) -> f64 {
        match self {
            TaskKind::ReachTarget => 0.03,
            TaskKind::PickUpCup | TaskKind::StackBlocks => 0.04,
            TaskKind::PutIntoDrawer => 0.035,
            TaskKind::OpenDoor => 0.025,
        }
    }

    /// Whether the gripper closes on the object and moves it.
    pub fn grasps_object(&self) -> bool {
        !matches!(self, TaskKind::ReachTarget)
    }

    /// Where the gripper ends up relative to the grasp point.
    pub fn goal_offset(&self) -> Vector3<f64> {
        match self {
            TaskKind::ReachTarget => Vector3::zeros(),
            TaskKind::PickUpCup => Vector3::new(0.0, 0.0, 0.2),
            TaskKind::PutIntoDrawer => Vector3::new(0.15, -0.1, 0.05),
            TaskKind::StackBlocks => Vector3::new(-0.1, 0.05, 0.08),
            TaskKind::OpenDoor => Vector3::new(0.0, 0.15, 0.0),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| SimError::UnknownTask(s.to_string()))
    }
}
