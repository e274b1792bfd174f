use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::db::{
    Category, CategoryInput, CategoryRepository, Facility, FacilityInput, FacilityRepository,
    PricingOption, PricingOptionInput, PricingOptionRepository,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

const MAX_CATEGORY_NAME_LEN: usize = 100;
const MAX_FACILITY_NAME_LEN: usize = 150;
const MAX_OPTION_NAME_LEN: usize = 100;

fn required_name(raw: &str, field: &str, max: usize) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation(i18n::t_with(
            "validation.required",
            &[("field", field)],
        )));
    }
    if name.chars().count() > max {
        return Err(AppError::Validation(i18n::t_with(
            "validation.too_long",
            &[("field", field), ("max", &max.to_string())],
        )));
    }
    Ok(name.to_string())
}

fn non_negative(value: f64, field: &str) -> AppResult<f64> {
    if !value.is_finite() {
        return Err(AppError::Validation(i18n::t_with(
            "validation.invalid_number",
            &[("field", field)],
        )));
    }
    if value < 0.0 {
        return Err(AppError::Validation(i18n::t_with(
            "validation.negative",
            &[("field", field)],
        )));
    }
    Ok(value)
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

pub struct CatalogService;

impl CatalogService {
    // ========================================================================
    // Categories
    // ========================================================================

    fn validate_category(input: CategoryInput) -> AppResult<CategoryInput> {
        Ok(CategoryInput {
            name: required_name(&input.name, "Category name", MAX_CATEGORY_NAME_LEN)?,
            description: clean_description(input.description),
        })
    }

    pub async fn add_category(state: &Arc<AppState>, input: CategoryInput) -> AppResult<Category> {
        let input = Self::validate_category(input)?;

        if CategoryRepository::find_by_name(&state.db, &input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(i18n::t_with(
                "conflict.category_exists",
                &[("name", input.name.as_str())],
            )));
        }

        let category = CategoryRepository::create(&state.db, &input).await?;
        tracing::info!("Category {} created", category.id);
        Ok(category)
    }

    pub async fn update_category(
        state: &Arc<AppState>,
        id: &str,
        input: CategoryInput,
    ) -> AppResult<Category> {
        let input = Self::validate_category(input)?;

        if let Some(existing) = CategoryRepository::find_by_name(&state.db, &input.name).await? {
            if existing.id != id {
                return Err(AppError::Conflict(i18n::t_with(
                    "conflict.category_exists",
                    &[("name", input.name.as_str())],
                )));
            }
        }

        CategoryRepository::update(&state.db, id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.category")))
    }

    /// Refuses while any facility still belongs to the category.
    pub async fn delete_category(state: &Arc<AppState>, id: &str) -> AppResult<()> {
        if CategoryRepository::find_by_id(&state.db, id).await?.is_none() {
            return Err(AppError::NotFound(i18n::t("not_found.category")));
        }

        let facilities = CategoryRepository::count_facilities(&state.db, id).await?;
        if facilities > 0 {
            return Err(AppError::Conflict(i18n::t_with(
                "conflict.category_in_use",
                &[("count", &facilities.to_string())],
            )));
        }

        CategoryRepository::delete(&state.db, id).await?;
        tracing::info!("Category {} deleted", id);
        Ok(())
    }

    // ========================================================================
    // Facilities
    // ========================================================================

    async fn validate_facility(
        state: &Arc<AppState>,
        input: FacilityInput,
    ) -> AppResult<FacilityInput> {
        let name = required_name(&input.name, "Facility name", MAX_FACILITY_NAME_LEN)?;
        let hourly_rate = non_negative(input.hourly_rate, "Hourly rate")?;
        let daily_rate = non_negative(input.daily_rate, "Daily rate")?;

        if CategoryRepository::find_by_id(&state.db, &input.category_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(i18n::t("not_found.category")));
        }

        Ok(FacilityInput {
            category_id: input.category_id,
            name,
            description: clean_description(input.description),
            hourly_rate,
            daily_rate,
        })
    }

    pub async fn add_facility(state: &Arc<AppState>, input: FacilityInput) -> AppResult<Facility> {
        let input = Self::validate_facility(state, input).await?;
        let facility = FacilityRepository::create(&state.db, &input).await?;
        tracing::info!("Facility {} created", facility.id);
        Ok(facility)
    }

    pub async fn update_facility(
        state: &Arc<AppState>,
        id: &str,
        input: FacilityInput,
    ) -> AppResult<Facility> {
        let input = Self::validate_facility(state, input).await?;
        FacilityRepository::update(&state.db, id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.facility")))
    }

    /// Pending or confirmed reservations that have not ended yet.
    pub async fn active_reservation_count(
        state: &Arc<AppState>,
        facility_id: &str,
        now: NaiveDateTime,
    ) -> AppResult<i64> {
        FacilityRepository::count_active_reservations(&state.db, facility_id, now).await
    }

    /// Flip `is_active`. Deactivation is refused while active reservations exist.
    pub async fn toggle_facility(
        state: &Arc<AppState>,
        id: &str,
        now: NaiveDateTime,
    ) -> AppResult<Facility> {
        let facility = FacilityRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.facility")))?;

        if facility.is_active {
            let active = Self::active_reservation_count(state, id, now).await?;
            if active > 0 {
                return Err(AppError::Conflict(i18n::t_with(
                    "conflict.facility_active_reservations",
                    &[("count", &active.to_string())],
                )));
            }
        }

        FacilityRepository::set_active(&state.db, id, !facility.is_active).await?;
        tracing::info!(
            "Facility {} {}",
            id,
            if facility.is_active { "deactivated" } else { "activated" }
        );

        FacilityRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.facility")))
    }

    // ========================================================================
    // Pricing options
    // ========================================================================

    async fn validate_pricing_option(
        state: &Arc<AppState>,
        input: PricingOptionInput,
    ) -> AppResult<PricingOptionInput> {
        let name = required_name(&input.name, "Option name", MAX_OPTION_NAME_LEN)?;
        let price_per_hour = non_negative(input.price_per_hour, "Price per hour")?;

        if FacilityRepository::find_by_id(&state.db, &input.facility_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(i18n::t("not_found.facility")));
        }

        Ok(PricingOptionInput {
            name,
            price_per_hour,
            ..input
        })
    }

    pub async fn add_pricing_option(
        state: &Arc<AppState>,
        input: PricingOptionInput,
    ) -> AppResult<PricingOption> {
        let input = Self::validate_pricing_option(state, input).await?;
        let option = PricingOptionRepository::create(&state.db, &input).await?;
        tracing::info!(
            "Pricing option {} created for facility {}",
            option.id,
            option.facility_id
        );
        Ok(option)
    }

    pub async fn update_pricing_option(
        state: &Arc<AppState>,
        id: &str,
        input: PricingOptionInput,
    ) -> AppResult<PricingOption> {
        let input = Self::validate_pricing_option(state, input).await?;
        PricingOptionRepository::update(&state.db, id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.pricing_option")))
    }

    /// Refuses while any reservation references the option.
    pub async fn delete_pricing_option(state: &Arc<AppState>, id: &str) -> AppResult<()> {
        if PricingOptionRepository::find_by_id(&state.db, id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(i18n::t("not_found.pricing_option")));
        }

        let refs = PricingOptionRepository::count_reservation_refs(&state.db, id).await?;
        if refs > 0 {
            return Err(AppError::Conflict(i18n::t_with(
                "conflict.pricing_in_use",
                &[("count", &refs.to_string())],
            )));
        }

        PricingOptionRepository::delete(&state.db, id).await?;
        tracing::info!("Pricing option {} deleted", id);
        Ok(())
    }
}
