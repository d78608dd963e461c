use std::collections::HashSet;

use wallpen_core::penetration::RayHit;

/// 按 (链接实例, 构件) 去重，保留首次出现的命中。
///
/// 距离不参与判等：同一面墙被穿过两次（例如复合墙的多层）只计一次。
pub fn dedupe<I>(hits: I) -> Vec<RayHit>
where
    I: IntoIterator<Item = RayHit>,
{
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.identity()))
        .collect()
}

/// 按距离升序稳定排序，使“首次出现”等价于“最近的穿越点”。
pub fn order_by_distance(hits: &mut [RayHit]) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}
