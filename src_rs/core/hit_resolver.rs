// 목적:
// - 색인 검색 히트를 실제 엔티티 레코드로 되돌린다.
//
// 설명:
// - 히트를 타입 UID별로 묶어 타입마다 저장소 일괄 조회를 1회만 수행한다(N+1 방지).
// - offset/limit 윈도우가 모두 주어지면 해당 구간만, 아니면 전체 히트를 조회한다.
// - 조회 결과는 원래 히트 순서(관련도 순)로 다시 정렬하며, 사라진 엔티티는 건너뛴다.
// - 키 표기가 히트와 달라 순서를 복원하지 못한 레코드는 버리지 않고 끝에 덧붙인다.
// - total_count는 윈도우 적용 전 히트 수다.
//
// 디자인 패턴:
// - 파이프라인(Pipeline): 윈도우 -> 그룹화 -> 일괄 조회 -> 순서 복원.
//
// 참조:
// - src_rs/core/type_registry.rs
// - src_rs/index/repository.rs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::entity::{key_string, Entity, EntityRecord, SearchHit, TypeUid};
use crate::core::errors::CoreResult;
use crate::core::type_registry::{TypeConfig, TypeRegistry};

/// 일괄 조회 시 함께 읽어오는 관계명.
pub const PAGE_RELATION: &str = "page";

/// 호출자가 넘기는 윈도우 옵션. 두 값이 모두 있어야 윈도우가 적용된다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOptions {
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl WindowOptions {
    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
        }
    }

    pub fn window(&self) -> Window {
        match (self.offset, self.limit) {
            (Some(offset), Some(limit)) => Window::Page { offset, limit },
            _ => Window::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    All,
    Page { offset: usize, limit: usize },
}

impl Window {
    /// 슬라이스 규칙으로 히트 구간을 자른다. 범위를 벗어난 offset은 빈 구간이다.
    pub fn apply<'a>(&self, hits: &'a [SearchHit]) -> &'a [SearchHit] {
        match *self {
            Window::All => hits,
            Window::Page { offset, limit } => {
                let start = offset.min(hits.len());
                let end = start.saturating_add(limit).min(hits.len());
                &hits[start..end]
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedHits {
    pub entities: Vec<EntityRecord>,
    pub total_count: usize,
}

#[derive(Debug)]
struct TypeGroup {
    type_uid: TypeUid,
    keys: Vec<String>,
}

pub struct HitResolver {
    registry: Arc<TypeRegistry>,
}

impl HitResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// 히트 한 건을 엔티티로 조회한다. 저장소에 없으면 `Ok(None)`.
    pub async fn resolve_one(&self, hit: &SearchHit) -> CoreResult<Option<EntityRecord>> {
        let config = self.registry.config_for_type_uid(&hit.type_uid)?;
        let found = config.repository.find_by_key(&hit.private_key).await?;
        if found.is_none() {
            tracing::debug!(
                type_name = %config.type_name,
                private_key = %hit.private_key,
                "색인 히트에 해당하는 엔티티가 없습니다"
            );
        }
        Ok(found)
    }

    /// 윈도우 옵션에 따라 전체 또는 페이지 경로로 분기한다.
    pub async fn resolve_many(
        &self,
        hits: &[SearchHit],
        options: WindowOptions,
    ) -> CoreResult<ResolvedHits> {
        match options.window() {
            Window::All => self.resolve_all(hits).await,
            Window::Page { offset, limit } => self.resolve_page(hits, offset, limit).await,
        }
    }

    pub async fn resolve_all(&self, hits: &[SearchHit]) -> CoreResult<ResolvedHits> {
        let entities = self.fetch_in_hit_order(hits).await?;
        Ok(ResolvedHits {
            entities,
            total_count: hits.len(),
        })
    }

    pub async fn resolve_page(
        &self,
        hits: &[SearchHit],
        offset: usize,
        limit: usize,
    ) -> CoreResult<ResolvedHits> {
        let page = Window::Page { offset, limit }.apply(hits);
        let entities = self.fetch_in_hit_order(page).await?;
        Ok(ResolvedHits {
            entities,
            total_count: hits.len(),
        })
    }

    async fn fetch_in_hit_order(&self, hits: &[SearchHit]) -> CoreResult<Vec<EntityRecord>> {
        let groups = group_by_type(hits);

        // 조회 전에 모든 타입 UID를 확인해 설정 불일치를 먼저 드러낸다.
        let plans = groups
            .iter()
            .map(|group| {
                self.registry
                    .config_for_type_uid(&group.type_uid)
                    .map(|config| (config, group))
            })
            .collect::<CoreResult<Vec<(&TypeConfig, &TypeGroup)>>>()?;

        // 조회 순서대로 보관하고, 키로 다시 읽을 수 있는 레코드만 색인한다.
        let mut fetched = Vec::<Option<EntityRecord>>::new();
        let mut positions = HashMap::<(TypeUid, String), usize>::new();
        for (config, group) in plans {
            tracing::debug!(
                type_name = %config.type_name,
                type_uid = %group.type_uid,
                keys = group.keys.len(),
                "엔티티를 일괄 조회합니다"
            );

            let records = config
                .repository
                .find_by_keys(&group.keys, &[PAGE_RELATION])
                .await?;

            for record in records {
                if let Some(key) = record.attribute(&config.private_key).and_then(key_string) {
                    positions
                        .entry((group.type_uid.clone(), key))
                        .or_insert(fetched.len());
                }
                fetched.push(Some(record));
            }
        }

        let mut entities = Vec::with_capacity(fetched.len());
        let mut emitted = HashSet::<(&TypeUid, &str)>::new();
        let mut stale = 0usize;
        for hit in hits {
            if !emitted.insert((&hit.type_uid, hit.private_key.as_str())) {
                continue;
            }
            let record = positions
                .get(&(hit.type_uid.clone(), hit.private_key.clone()))
                .and_then(|position| fetched.get_mut(*position).and_then(Option::take));
            match record {
                Some(record) => entities.push(record),
                None => stale += 1,
            }
        }

        // 히트 키와 표기가 달라 짝을 못 찾은 레코드도 저장소가 돌려준 것이므로 뒤에 붙인다.
        let unmatched = fetched.into_iter().flatten().collect::<Vec<_>>();
        if !unmatched.is_empty() {
            tracing::debug!(
                unmatched = unmatched.len(),
                "히트 키와 일치하지 않는 레코드를 조회 순서대로 덧붙입니다"
            );
            stale = stale.saturating_sub(unmatched.len());
            entities.extend(unmatched);
        }

        if stale > 0 {
            tracing::warn!(stale, "저장소에 없는 색인 히트를 건너뛰었습니다");
        }

        Ok(entities)
    }
}

/// 히트를 처음 등장한 순서대로 타입 UID별 키 목록으로 묶는다. 중복 키는 한 번만 담는다.
fn group_by_type(hits: &[SearchHit]) -> Vec<TypeGroup> {
    let mut positions = HashMap::<&TypeUid, usize>::new();
    let mut seen = HashSet::<(&TypeUid, &str)>::new();
    let mut groups = Vec::<TypeGroup>::new();

    for hit in hits {
        if !seen.insert((&hit.type_uid, hit.private_key.as_str())) {
            continue;
        }

        let index = *positions.entry(&hit.type_uid).or_insert_with(|| {
            groups.push(TypeGroup {
                type_uid: hit.type_uid.clone(),
                keys: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].keys.push(hit.private_key.clone());
    }

    groups
}
