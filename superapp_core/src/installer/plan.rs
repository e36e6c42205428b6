/// What a sync pass has to do to match the remote allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_remove: Vec<String>,
    pub to_install: Vec<String>,
}

impl SyncPlan {
    /// Diff the allowed ids against the locally downloaded ones.
    ///
    /// Both lists keep the order of their source; duplicates are collapsed.
    pub fn compute(allowed: &[String], downloaded: &[String]) -> Self {
        let mut plan = Self::default();
        for app_id in downloaded {
            if !allowed.contains(app_id) && !plan.to_remove.contains(app_id) {
                plan.to_remove.push(app_id.clone());
            }
        }
        for app_id in allowed {
            if !downloaded.contains(app_id) && !plan.to_install.contains(app_id) {
                plan.to_install.push(app_id.clone());
            }
        }
        plan
    }

    pub fn total(&self) -> usize {
        self.to_remove.len() + self.to_install.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_remove_and_install_sets() {
        let plan = SyncPlan::compute(&ids(&["b", "c"]), &ids(&["a", "b"]));
        assert_eq!(plan.to_remove, ids(&["a"]));
        assert_eq!(plan.to_install, ids(&["c"]));
        assert_eq!(plan.total(), 2);
    }

    #[test]
    fn test_empty_allow_list_removes_everything() {
        let plan = SyncPlan::compute(&[], &ids(&["a", "b"]));
        assert_eq!(plan.to_remove, ids(&["a", "b"]));
        assert!(plan.to_install.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let plan = SyncPlan::compute(&ids(&["c", "c"]), &[]);
        assert_eq!(plan.to_install, ids(&["c"]));
        assert!(SyncPlan::compute(&ids(&["a"]), &ids(&["a"])).is_empty());
    }
}
