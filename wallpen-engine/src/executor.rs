use tracing::{debug, info};
use wallpen_core::penetration::{ParameterKind, PlannedPlacement};

use crate::errors::EngineError;
use crate::host::{FamilyTemplate, ParameterAccessor, PlacementHost, TransactionManager};

/// 在单个事务中放置一批洞口实例，并写入宽、高参数。
pub struct PlacementExecutor<'a> {
    template: &'a FamilyTemplate,
}

impl<'a> PlacementExecutor<'a> {
    pub fn new(template: &'a FamilyTemplate) -> Self {
        Self { template }
    }

    /// 返回创建的实例数量。任一实例失败则整批回滚。
    pub fn execute<H>(
        &self,
        host: &mut H,
        transaction: &str,
        placements: &[PlannedPlacement],
    ) -> Result<usize, EngineError>
    where
        H: PlacementHost + ParameterAccessor + TransactionManager,
    {
        let created = host.transaction(transaction, |host| {
            for placement in placements {
                let instance = host.create_instance(self.template, placement)?;
                host.set_scalar(instance, ParameterKind::Width, placement.size)?;
                host.set_scalar(instance, ParameterKind::Height, placement.size)?;
                debug!(
                    instance = instance.get(),
                    source = placement.source.get(),
                    wall = placement.wall.element.get(),
                    distance = placement.distance,
                    "已放置洞口"
                );
            }
            Ok(placements.len())
        })?;
        info!(transaction, created, family = %self.template.family_name, "批次完成");
        Ok(created)
    }
}
