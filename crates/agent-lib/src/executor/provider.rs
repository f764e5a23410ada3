//! Provider-specific scaling commands

use crate::config::CloudProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Up,
    Down,
}

impl ScaleDirection {
    pub fn sign(&self) -> char {
        match self {
            ScaleDirection::Up => '+',
            ScaleDirection::Down => '-',
        }
    }

    /// Parameter holding the step size
    pub fn amount_key(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "increase",
            ScaleDirection::Down => "decrease",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "scale up",
            ScaleDirection::Down => "scale down",
        }
    }
}

/// Scaling command for `provider`, or `None` when scaling is simulated
pub fn scale_command(
    provider: CloudProvider,
    direction: ScaleDirection,
    target: &str,
    metric: &str,
    amount: &str,
) -> Option<String> {
    let sign = direction.sign();
    match provider {
        CloudProvider::Aws => Some(match metric {
            "instances" => format!(
                "aws autoscaling set-desired-capacity --auto-scaling-group-name {} --desired-capacity {}{}",
                target, sign, amount
            ),
            "cpu" => {
                let instance_type = match direction {
                    ScaleDirection::Up => "t3.large",
                    ScaleDirection::Down => "t3.small",
                };
                format!(
                    "aws ec2 modify-instance-attribute --instance-id {} --instance-type {}",
                    target, instance_type
                )
            }
            _ => format!(
                "aws autoscaling update-auto-scaling-group --auto-scaling-group-name {}",
                target
            ),
        }),
        CloudProvider::Gcp => Some(format!(
            "gcloud compute instance-groups managed resize {} --size {}{}",
            target, sign, amount
        )),
        CloudProvider::Azure => Some(format!(
            "az vmss scale --name {} --new-capacity {}{}",
            target, sign, amount
        )),
        CloudProvider::Generic => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_commands_by_metric() {
        let cmd = scale_command(CloudProvider::Aws, ScaleDirection::Up, "compute", "cpu", "25%");
        assert_eq!(
            cmd.as_deref(),
            Some("aws ec2 modify-instance-attribute --instance-id compute --instance-type t3.large")
        );

        let cmd = scale_command(CloudProvider::Aws, ScaleDirection::Down, "web-asg", "instances", "1");
        assert_eq!(
            cmd.as_deref(),
            Some("aws autoscaling set-desired-capacity --auto-scaling-group-name web-asg --desired-capacity -1")
        );
    }

    #[test]
    fn test_other_providers() {
        assert_eq!(
            scale_command(CloudProvider::Gcp, ScaleDirection::Up, "ig", "instances", "1").as_deref(),
            Some("gcloud compute instance-groups managed resize ig --size +1")
        );
        assert_eq!(
            scale_command(CloudProvider::Azure, ScaleDirection::Down, "ss", "cpu", "20%").as_deref(),
            Some("az vmss scale --name ss --new-capacity -20%")
        );
        assert!(scale_command(CloudProvider::Generic, ScaleDirection::Up, "x", "cpu", "1").is_none());
    }
}
